use std::path::{Path, PathBuf};

use super::error::EdxError;
use super::grid::DEFAULT_GRID_POINTS;
use super::matcher::{DEFAULT_MIN_PEAKS_REQUIRED, DEFAULT_TOLERANCE_KEV, MatchSettings};
use super::peak_finder::PeakFindingSettings;
use super::reference::ElementSelection;

pub const MAX_SPECTRUM_FILES: usize = 4;

/// Everything one analysis run needs. Built once and never changed while
/// the run is in progress.
#[derive(Debug, Clone, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub spectrum_paths: Vec<PathBuf>,
    pub background_path: Option<PathBuf>,
    pub reference_path: PathBuf,
    pub selection: ElementSelection,
    pub tolerance_kev: f64,
    pub min_peaks_required: usize,
    pub min_peak_height: Option<f64>,
    pub min_peak_prominence: Option<f64>,
    /// Minimum spacing between peaks, in grid points.
    pub min_peak_distance: Option<usize>,
    pub grid_points: usize,
    /// Where match tables are written. Next to each spectrum when unset.
    pub output_dir: Option<PathBuf>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        AnalysisConfig {
            spectrum_paths: Vec::new(),
            background_path: None,
            reference_path: PathBuf::new(),
            selection: ElementSelection::All,
            tolerance_kev: DEFAULT_TOLERANCE_KEV,
            min_peaks_required: DEFAULT_MIN_PEAKS_REQUIRED,
            min_peak_height: None,
            min_peak_prominence: None,
            min_peak_distance: None,
            grid_points: DEFAULT_GRID_POINTS,
            output_dir: None,
        }
    }
}

impl AnalysisConfig {
    pub fn from_yaml_str(text: &str) -> Result<Self, EdxError> {
        Ok(serde_yaml::from_str(text)?)
    }

    pub fn from_yaml_file(path: &Path) -> Result<Self, EdxError> {
        let text = std::fs::read_to_string(path)?;
        log::info!("Loaded analysis configuration from {}", path.display());
        Self::from_yaml_str(&text)
    }

    pub fn validate(&self) -> Result<(), EdxError> {
        if self.spectrum_paths.is_empty() {
            return Err(EdxError::Config("no spectrum files selected".to_owned()));
        }
        if self.spectrum_paths.len() > MAX_SPECTRUM_FILES {
            return Err(EdxError::Config(format!(
                "{} spectrum files selected, at most {} are supported",
                self.spectrum_paths.len(),
                MAX_SPECTRUM_FILES
            )));
        }
        if self.reference_path.as_os_str().is_empty() {
            return Err(EdxError::Config("no reference file selected".to_owned()));
        }
        if !self.tolerance_kev.is_finite() || self.tolerance_kev <= 0.0 {
            return Err(EdxError::Config(format!(
                "tolerance must be a positive number of keV, got {}",
                self.tolerance_kev
            )));
        }
        if self.min_peaks_required == 0 {
            return Err(EdxError::Config(
                "at least one matched peak must be required".to_owned(),
            ));
        }
        for (name, value) in [
            ("minimum peak height", self.min_peak_height),
            ("minimum peak prominence", self.min_peak_prominence),
        ] {
            if value.is_some_and(|value| !value.is_finite() || value < 0.0) {
                return Err(EdxError::Config(format!(
                    "{} must be a non-negative number, got {:?}",
                    name, value
                )));
            }
        }
        if self.grid_points < 2 {
            return Err(EdxError::Config(format!(
                "the energy grid needs at least 2 points, got {}",
                self.grid_points
            )));
        }
        Ok(())
    }

    pub fn match_settings(&self) -> MatchSettings {
        MatchSettings {
            tolerance_kev: self.tolerance_kev,
            min_peaks_required: self.min_peaks_required,
        }
    }

    pub fn peak_settings(&self) -> PeakFindingSettings {
        PeakFindingSettings {
            min_height: self.min_peak_height,
            min_prominence: self.min_peak_prominence,
            min_distance: self.min_peak_distance,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> AnalysisConfig {
        AnalysisConfig {
            spectrum_paths: vec![PathBuf::from("a.csv")],
            reference_path: PathBuf::from("nist.csv"),
            ..Default::default()
        }
    }

    #[test]
    fn test_yaml_defaults() {
        let config = AnalysisConfig::from_yaml_str(
            "spectrum_paths: [a.csv, b.csv]\nreference_path: nist.csv\nselection: !Elements [Cu, Fe]\n",
        )
        .unwrap();
        assert_eq!(config.spectrum_paths.len(), 2);
        assert_eq!(config.tolerance_kev, DEFAULT_TOLERANCE_KEV);
        assert_eq!(config.min_peaks_required, 2);
        assert_eq!(config.grid_points, 1000);
        assert_eq!(
            config.selection,
            ElementSelection::Elements(vec!["Cu".to_owned(), "Fe".to_owned()])
        );
        assert!(config.validate().is_ok());
        assert_eq!(config.peak_settings(), PeakFindingSettings::default());
    }

    #[test]
    fn test_peak_filters_reach_peak_settings() {
        let config = AnalysisConfig::from_yaml_str(
            "spectrum_paths: [a.csv]\nreference_path: nist.csv\nmin_peak_height: 0.01\nmin_peak_prominence: 0.002\nmin_peak_distance: 5\n",
        )
        .unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(
            config.peak_settings(),
            PeakFindingSettings {
                min_height: Some(0.01),
                min_prominence: Some(0.002),
                min_distance: Some(5),
            }
        );
    }

    #[test]
    fn test_validation() {
        assert!(valid().validate().is_ok());

        let mut too_many = valid();
        too_many.spectrum_paths = (0..5).map(|i| PathBuf::from(format!("{i}.csv"))).collect();
        assert!(matches!(too_many.validate(), Err(EdxError::Config(_))));

        let mut no_reference = valid();
        no_reference.reference_path = PathBuf::new();
        assert!(no_reference.validate().is_err());

        let mut zero_tolerance = valid();
        zero_tolerance.tolerance_kev = 0.0;
        assert!(zero_tolerance.validate().is_err());

        let mut negative_prominence = valid();
        negative_prominence.min_peak_prominence = Some(-1.0);
        assert!(negative_prominence.validate().is_err());

        let mut zero_peaks = valid();
        zero_peaks.min_peaks_required = 0;
        assert!(zero_peaks.validate().is_err());
    }
}
