use polars::prelude::*;
use std::fs::File;
use std::path::{Path, PathBuf};

use super::error::EdxError;
use super::grid::CommonGrid;
use super::matcher::ElementMatch;
use super::normalizer::ev_to_kev;
use super::pipeline::{AnalysisOutput, AnalysisResult};
use super::reference::ReferenceTable;

/// Two prominent lines (keV) for common elements, always marked on plots.
pub const KNOWN_LINES_KEV: [(&str, [f64; 2]); 20] = [
    ("Al", [1.486, 1.557]),
    ("Fe", [6.400, 7.058]),
    ("Ni", [7.471, 8.265]),
    ("Cu", [8.048, 8.905]),
    ("Zn", [8.639, 9.571]),
    ("Pt", [9.441, 11.072]),
    ("Pd", [2.838, 2.986]),
    ("Rh", [2.697, 2.834]),
    ("Os", [8.907, 10.449]),
    ("Ir", [9.175, 10.574]),
    ("Ti", [4.508, 4.931]),
    ("Cr", [5.415, 5.946]),
    ("Mn", [5.899, 6.490]),
    ("Ca", [3.691, 4.012]),
    ("S", [2.307, 2.464]),
    ("P", [2.013, 2.139]),
    ("Si", [1.739, 1.835]),
    ("Cl", [2.622, 2.815]),
    ("K", [3.312, 3.590]),
    ("Mg", [1.254, 1.302]),
];

/// `<dir>/<stem>_analyzed.csv`, with `dir` defaulting to the source's own
/// directory.
pub fn match_table_path(source: &Path, output_dir: Option<&Path>) -> PathBuf {
    let stem = source
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "spectrum".to_owned());
    let file_name = format!("{}_analyzed.csv", stem);
    match output_dir {
        Some(dir) => dir.join(file_name),
        None => source.with_file_name(file_name),
    }
}

pub fn match_table(matches: &[ElementMatch]) -> PolarsResult<DataFrame> {
    let elements: Vec<&str> = matches.iter().map(|m| m.element.as_str()).collect();
    let matched: Vec<u64> = matches.iter().map(|m| m.matched_peaks as u64).collect();
    let total: Vec<u64> = matches
        .iter()
        .map(|m| m.total_reference_peaks as u64)
        .collect();
    let scores: Vec<f64> = matches.iter().map(|m| m.score).collect();

    df!(
        "Element" => elements,
        "Matched Peaks" => matched,
        "Total Peaks" => total,
        "Score" => scores
    )
}

pub fn write_match_table(matches: &[ElementMatch], path: &Path) -> Result<(), EdxError> {
    log::info!("Writing match table to {}", path.display());
    let mut df = match_table(matches)?;
    let mut file = File::create(path)?;
    CsvWriter::new(&mut file)
        .include_header(true)
        .finish(&mut df)?;
    Ok(())
}

/// Writes one match table per result and returns the paths written.
pub fn write_match_tables(
    results: &[AnalysisResult],
    output_dir: Option<&Path>,
) -> Result<Vec<PathBuf>, EdxError> {
    if let Some(dir) = output_dir {
        std::fs::create_dir_all(dir)?;
    }

    let mut written = Vec::with_capacity(results.len());
    for result in results {
        let path = match_table_path(&result.source, output_dir);
        write_match_table(&result.matches, &path)?;
        written.push(path);
    }
    Ok(written)
}

/// Tab-separated table of every match across all spectra.
pub fn summary_table(results: &[AnalysisResult]) -> String {
    let mut text = String::from("Element\tMatched Peaks\tTotal Peaks\tScore\n");
    text.extend(results.iter().flat_map(|result| &result.matches).map(|m| {
        format!(
            "{}\t{}\t{}\t{:.2}\n",
            m.element, m.matched_peaks, m.total_reference_peaks, m.score
        )
    }));
    text
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct GroupIntensity {
    pub source: PathBuf,
    pub element: String,
    pub intensity: f64,
}

/// Sum of corrected counts at the grid points nearest each reference line,
/// for every detected element of every spectrum.
pub fn group_intensities(
    results: &[AnalysisResult],
    grid: &CommonGrid,
    reference: &ReferenceTable,
) -> Vec<GroupIntensity> {
    let mut rows = Vec::new();
    for result in results {
        for element in &result.detected_elements {
            let Some(lines) = reference.lines(element) else {
                continue;
            };
            let intensity = lines
                .iter()
                .map(|&line| result.corrected[grid.nearest_index(ev_to_kev(line))])
                .sum();
            rows.push(GroupIntensity {
                source: result.source.clone(),
                element: element.clone(),
                intensity,
            });
        }
    }
    rows
}

pub fn group_intensity_table(rows: &[GroupIntensity]) -> String {
    let mut text = String::from("File\tElement\tIntensity\n");
    text.extend(rows.iter().map(|row| {
        format!(
            "{}\t{}\t{:.2}\n",
            row.source.display(),
            row.element,
            row.intensity
        )
    }));
    text
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Trace {
    pub name: String,
    pub counts: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Marker {
    pub label: String,
    pub energy_kev: f64,
    pub counts: f64,
    /// Index of the trace the marker belongs to; `None` for known-line
    /// markers drawn across all traces.
    pub trace: Option<usize>,
}

/// Everything a plotting front end needs to draw a run.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct PlotSeries {
    pub energies_kev: Vec<f64>,
    pub traces: Vec<Trace>,
    pub element_markers: Vec<Marker>,
    pub known_line_markers: Vec<Marker>,
}

impl PlotSeries {
    pub fn new(output: &AnalysisOutput) -> Self {
        let grid = &output.grid;

        let traces = output
            .results
            .iter()
            .map(|result| Trace {
                name: result.source.display().to_string(),
                counts: result.corrected.clone(),
            })
            .collect();

        let mut element_markers = Vec::new();
        for (trace, result) in output.results.iter().enumerate() {
            for m in &result.matches {
                for &line in output.reference.lines(&m.element).unwrap_or_default() {
                    let energy_kev = ev_to_kev(line);
                    element_markers.push(Marker {
                        label: m.element.clone(),
                        energy_kev,
                        counts: result.corrected[grid.nearest_index(energy_kev)],
                        trace: Some(trace),
                    });
                }
            }
        }

        let known_line_markers = KNOWN_LINES_KEV
            .iter()
            .flat_map(|(element, lines)| lines.iter().map(move |&energy| (*element, energy)))
            .map(|(element, energy_kev)| {
                let index = grid.nearest_index(energy_kev);
                let counts = output
                    .results
                    .iter()
                    .map(|result| result.corrected[index])
                    .fold(0.0, f64::max);
                Marker {
                    label: format!("{} ({} keV)", element, energy_kev),
                    energy_kev,
                    counts,
                    trace: None,
                }
            })
            .collect();

        PlotSeries {
            energies_kev: grid.energies().to_vec(),
            traces,
            element_markers,
            known_line_markers,
        }
    }

    pub fn write_json(&self, path: &Path) -> Result<(), EdxError> {
        log::info!("Writing plot series to {}", path.display());
        let file = File::create(path)?;
        serde_json::to_writer_pretty(file, self)?;
        Ok(())
    }
}
