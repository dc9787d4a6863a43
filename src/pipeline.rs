use rayon::prelude::*;
use std::fmt::Display;
use std::path::{Path, PathBuf};

use super::background::subtract_background;
use super::config::AnalysisConfig;
use super::error::EdxError;
use super::grid::{CommonGrid, resample};
use super::matcher::{ElementMatch, MatchSettings, detected_elements, match_elements};
use super::normalizer::{NormalizedSpectrum, normalize};
use super::peak_finder::{DetectedPeak, PeakFindingSettings};
use super::reference::ReferenceTable;
use super::spectrum_reader::read_spectrum;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunState {
    Idle,
    FilesSelected,
    GridComputed,
    PerSpectrumProcessing,
    Completed,
    Failed(String),
}

impl Display for RunState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunState::Idle => write!(f, "idle"),
            RunState::FilesSelected => write!(f, "files selected"),
            RunState::GridComputed => write!(f, "grid computed"),
            RunState::PerSpectrumProcessing => write!(f, "processing spectra"),
            RunState::Completed => write!(f, "completed"),
            RunState::Failed(reason) => write!(f, "failed: {}", reason),
        }
    }
}

/// A failure the run recovered from by skipping one input.
#[derive(Debug)]
pub struct RunWarning {
    pub source: Option<PathBuf>,
    pub error: EdxError,
}

impl Display for RunWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.error)
    }
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct AnalysisResult {
    pub source: PathBuf,
    pub corrected: Vec<f64>,
    pub peaks: Vec<DetectedPeak>,
    pub detected_elements: Vec<String>,
    pub matches: Vec<ElementMatch>,
}

#[derive(Debug)]
pub struct AnalysisOutput {
    pub grid: CommonGrid,
    /// Reference lines of the selected elements, used for plot markers and
    /// group intensities.
    pub reference: ReferenceTable,
    pub results: Vec<AnalysisResult>,
    pub warnings: Vec<RunWarning>,
}

/// Read and normalize one file.
pub fn load_spectrum(path: &Path) -> Result<NormalizedSpectrum, EdxError> {
    let raw = read_spectrum(path)?;
    normalize(&raw)
}

/// Resample, correct, detect and match a single spectrum.
pub fn analyze_spectrum(
    spectrum: &NormalizedSpectrum,
    grid: &CommonGrid,
    background: Option<&[f64]>,
    reference: &ReferenceTable,
    peak_settings: &PeakFindingSettings,
    match_settings: &MatchSettings,
) -> Result<AnalysisResult, EdxError> {
    let counts = resample(spectrum, grid);
    let corrected = subtract_background(&counts, background)?;

    let peaks = peak_settings.find_peaks(&corrected, grid);
    let peak_energies: Vec<f64> = peaks.iter().map(|peak| peak.energy_kev).collect();

    let matches = match_elements(&peak_energies, reference, match_settings);
    log::debug!(
        "{}: {} peaks, {} elements detected",
        spectrum.source.display(),
        peaks.len(),
        matches.len()
    );

    Ok(AnalysisResult {
        source: spectrum.source.clone(),
        corrected,
        peaks,
        detected_elements: detected_elements(&matches),
        matches,
    })
}

#[derive(Debug)]
pub struct Pipeline {
    config: AnalysisConfig,
    state: RunState,
}

impl Pipeline {
    pub fn new(config: AnalysisConfig) -> Self {
        Pipeline {
            config,
            state: RunState::Idle,
        }
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    pub fn state(&self) -> &RunState {
        &self.state
    }

    fn transition(&mut self, state: RunState) {
        log::info!("Analysis run: {} -> {}", self.state, state);
        self.state = state;
    }

    fn fail(&mut self, error: EdxError) -> EdxError {
        log::error!("Analysis run failed: {}", error);
        self.transition(RunState::Failed(error.to_string()));
        error
    }

    fn warn(warnings: &mut Vec<RunWarning>, source: &Path, error: EdxError) {
        log::warn!("Skipping {}: {}", source.display(), error);
        warnings.push(RunWarning {
            source: Some(source.to_path_buf()),
            error,
        });
    }

    pub fn run(&mut self) -> Result<AnalysisOutput, EdxError> {
        if let Err(e) = self.config.validate() {
            return Err(self.fail(e));
        }

        let reference = match ReferenceTable::from_csv(&self.config.reference_path) {
            Ok(table) => table.restrict(&self.config.selection),
            Err(e) => return Err(self.fail(e)),
        };

        let mut warnings = Vec::new();

        let loaded: Vec<(PathBuf, Result<NormalizedSpectrum, EdxError>)> = self
            .config
            .spectrum_paths
            .par_iter()
            .map(|path| (path.clone(), load_spectrum(path)))
            .collect();

        let mut spectra = Vec::with_capacity(loaded.len());
        for (path, spectrum) in loaded {
            match spectrum {
                Ok(spectrum) => spectra.push(spectrum),
                Err(e) => Self::warn(&mut warnings, &path, e),
            }
        }
        self.transition(RunState::FilesSelected);

        if spectra.is_empty() {
            return Err(self.fail(EdxError::EmptyResultSet));
        }

        let grid = match CommonGrid::spanning(&spectra, self.config.grid_points) {
            Ok(grid) => grid,
            Err(e) => return Err(self.fail(e)),
        };

        let background = match &self.config.background_path {
            Some(path) => match load_spectrum(path) {
                Ok(spectrum) => Some(resample(&spectrum, &grid)),
                Err(e) => {
                    log::warn!("Background not used, continuing without it: {}", e);
                    warnings.push(RunWarning {
                        source: Some(path.clone()),
                        error: e,
                    });
                    None
                }
            },
            None => None,
        };
        self.transition(RunState::GridComputed);

        self.transition(RunState::PerSpectrumProcessing);
        let peak_settings = self.config.peak_settings();
        let match_settings = self.config.match_settings();
        let analyzed: Vec<Result<AnalysisResult, EdxError>> = spectra
            .par_iter()
            .map(|spectrum| {
                analyze_spectrum(
                    spectrum,
                    &grid,
                    background.as_deref(),
                    &reference,
                    &peak_settings,
                    &match_settings,
                )
            })
            .collect();

        let mut results = Vec::with_capacity(analyzed.len());
        for (spectrum, result) in spectra.iter().zip(analyzed) {
            match result {
                Ok(result) => results.push(result),
                Err(e) => Self::warn(&mut warnings, &spectrum.source, e),
            }
        }

        if results.is_empty() {
            return Err(self.fail(EdxError::EmptyResultSet));
        }

        self.transition(RunState::Completed);
        Ok(AnalysisOutput {
            grid,
            reference,
            results,
            warnings,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalizer::NormalizedPoint;

    fn gaussian_spectrum(centers_kev: &[f64]) -> NormalizedSpectrum {
        let points = (0..=1200)
            .map(|i| {
                let energy_kev = i as f64 * 0.01;
                let counts_per_total = centers_kev
                    .iter()
                    .map(|c| (-(energy_kev - c).powi(2) / (2.0 * 0.03_f64.powi(2))).exp())
                    .sum::<f64>();
                NormalizedPoint {
                    energy_kev,
                    counts_per_total,
                }
            })
            .collect();
        NormalizedSpectrum {
            source: PathBuf::from("synthetic.csv"),
            points,
        }
    }

    #[test]
    fn test_analyze_spectrum_detects_copper() {
        let spectrum = gaussian_spectrum(&[8.048, 8.905]);
        let grid = CommonGrid::spanning(std::slice::from_ref(&spectrum), 1000).unwrap();
        let reference = ReferenceTable::from_entries([
            ("Cu", 8048.0),
            ("Cu", 8905.0),
            ("Fe", 6400.0),
            ("Fe", 7058.0),
        ]);
        let result = analyze_spectrum(
            &spectrum,
            &grid,
            None,
            &reference,
            &PeakFindingSettings::default(),
            &MatchSettings::default(),
        )
        .unwrap();

        assert_eq!(result.corrected.len(), 1000);
        assert_eq!(result.detected_elements, vec!["Cu".to_owned()]);
        assert_eq!(result.matches[0].score, 1.0);
    }

    #[test]
    fn test_background_removes_signal() {
        let spectrum = gaussian_spectrum(&[8.048, 8.905]);
        let grid = CommonGrid::spanning(std::slice::from_ref(&spectrum), 1000).unwrap();
        let background = resample(&spectrum, &grid);
        let reference = ReferenceTable::from_entries([("Cu", 8048.0), ("Cu", 8905.0)]);
        let result = analyze_spectrum(
            &spectrum,
            &grid,
            Some(&background),
            &reference,
            &PeakFindingSettings::default(),
            &MatchSettings::default(),
        )
        .unwrap();

        assert!(result.corrected.iter().all(|&y| y == 0.0));
        assert!(result.peaks.is_empty());
        assert!(result.matches.is_empty());
    }

    #[test]
    fn test_invalid_config_fails_run() {
        let mut pipeline = Pipeline::new(AnalysisConfig::default());
        assert!(matches!(pipeline.run(), Err(EdxError::Config(_))));
        assert!(matches!(pipeline.state(), RunState::Failed(_)));
    }
}
