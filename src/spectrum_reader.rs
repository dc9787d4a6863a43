use super::error::EdxError;
use std::path::{Path, PathBuf};

const DELIMITER: char = ';';
const HEADER_ROWS: usize = 8;
const VOLTAGE_ROW: usize = 0;
const TOTAL_COUNTS_ROW: usize = 2;
const MIN_DATA_ROWS: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SpectrumMetadata {
    pub voltage: f64,
    /// `None` when the header cell is present but not a number.
    pub total_counts: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct RawPoint {
    pub energy_ev: f64,
    pub counts: f64,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct RawSpectrum {
    pub source: PathBuf,
    pub points: Vec<RawPoint>,
    pub metadata: SpectrumMetadata,
}

fn parse_number(cell: &str) -> Option<f64> {
    cell.trim().parse::<f64>().ok().filter(|value| value.is_finite())
}

fn header_cell<'a>(
    header: &[&'a str],
    row: usize,
    name: &str,
    path: &Path,
) -> Result<&'a str, EdxError> {
    header
        .get(row)
        .and_then(|line| line.split(DELIMITER).nth(1))
        .map(str::trim)
        .filter(|cell| !cell.is_empty())
        .ok_or_else(|| EdxError::malformed(path, format!("missing {} in header row {}", name, row)))
}

/// Parses the text of a spectrum file. `path` is only used to label errors.
pub fn parse_spectrum(text: &str, path: &Path) -> Result<RawSpectrum, EdxError> {
    let lines: Vec<&str> = text.lines().collect();
    if lines.len() < HEADER_ROWS {
        return Err(EdxError::malformed(
            path,
            format!(
                "expected a {} row header, found {} rows",
                HEADER_ROWS,
                lines.len()
            ),
        ));
    }

    let (header, data) = lines.split_at(HEADER_ROWS);

    let voltage_cell = header_cell(header, VOLTAGE_ROW, "voltage", path)?;
    let voltage = parse_number(voltage_cell).ok_or_else(|| {
        EdxError::malformed(path, format!("voltage '{}' is not numeric", voltage_cell))
    })?;
    let total_counts = parse_number(header_cell(header, TOTAL_COUNTS_ROW, "total counts", path)?);

    let mut rows = data
        .iter()
        .map(|line| line.trim())
        .filter(|line| !line.is_empty())
        .peekable();

    // The data block may start with a repeat of the column labels
    let has_label_row = rows.peek().is_some_and(|first| {
        parse_number(first.split(DELIMITER).next().unwrap_or_default()).is_none()
    });
    if has_label_row {
        log::debug!("Skipping column label row in {}", path.display());
        rows.next();
    }

    let mut dropped = 0;
    let mut points = Vec::new();
    for row in rows {
        let mut cells = row.split(DELIMITER);
        let energy = cells.next().and_then(parse_number);
        let counts = cells.next().and_then(parse_number);
        match (energy, counts) {
            (Some(energy_ev), Some(counts)) => points.push(RawPoint { energy_ev, counts }),
            _ => dropped += 1,
        }
    }

    if dropped > 0 {
        log::debug!("Dropped {} non-numeric rows from {}", dropped, path.display());
    }

    if points.len() < MIN_DATA_ROWS {
        return Err(EdxError::malformed(
            path,
            format!(
                "found {} numeric data rows, at least {} are required",
                points.len(),
                MIN_DATA_ROWS
            ),
        ));
    }

    Ok(RawSpectrum {
        source: path.to_path_buf(),
        points,
        metadata: SpectrumMetadata {
            voltage,
            total_counts,
        },
    })
}

pub fn read_spectrum(path: &Path) -> Result<RawSpectrum, EdxError> {
    let text = std::fs::read_to_string(path).map_err(|e| EdxError::malformed(path, e.to_string()))?;
    parse_spectrum(&text, path)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_text(total_counts: &str, with_labels: bool) -> String {
        let mut text = format!(
            "Voltage;20\nLive time;30\nTotal counts;{}\nDetector;SDD\n4;\n5;\n6;\n7;\n",
            total_counts
        );
        if with_labels {
            text.push_str("Energy [eV];Counts\n");
        }
        text.push_str("1000;10\n1010;12\n1020;oops\n1030;9\n");
        text
    }

    #[test]
    fn test_parse_header_and_data() {
        let raw = parse_spectrum(&sample_text("5000", true), Path::new("a.csv")).unwrap();
        assert_eq!(raw.metadata.voltage, 20.0);
        assert_eq!(raw.metadata.total_counts, Some(5000.0));
        assert_eq!(raw.points.len(), 3);
        assert_eq!(raw.points[0], RawPoint { energy_ev: 1000.0, counts: 10.0 });
        assert_eq!(raw.points[2], RawPoint { energy_ev: 1030.0, counts: 9.0 });
    }

    #[test]
    fn test_label_row_is_optional() {
        let with = parse_spectrum(&sample_text("5000", true), Path::new("a.csv")).unwrap();
        let without = parse_spectrum(&sample_text("5000", false), Path::new("a.csv")).unwrap();
        assert_eq!(with.points, without.points);
    }

    #[test]
    fn test_non_numeric_total_counts_is_carried() {
        let raw = parse_spectrum(&sample_text("n/a", false), Path::new("a.csv")).unwrap();
        assert_eq!(raw.metadata.total_counts, None);
    }

    #[test]
    fn test_non_finite_rows_are_dropped() {
        let mut text = sample_text("5000", true);
        text.push_str("1e400;5\ninf;3\n1040;-inf\nNaN;2\n");
        let raw = parse_spectrum(&text, Path::new("a.csv")).unwrap();
        assert_eq!(raw.points.len(), 3);
        assert!(raw.points.iter().all(|p| p.energy_ev.is_finite() && p.counts.is_finite()));
    }

    #[test]
    fn test_infinite_total_counts_is_not_numeric() {
        let raw = parse_spectrum(&sample_text("inf", false), Path::new("a.csv")).unwrap();
        assert_eq!(raw.metadata.total_counts, None);
    }

    #[test]
    fn test_short_header_is_malformed() {
        let result = parse_spectrum("Voltage;20\nx;1\n", Path::new("short.csv"));
        assert!(matches!(result, Err(EdxError::MalformedSpectrumFile { .. })));
    }

    #[test]
    fn test_non_numeric_voltage_is_malformed() {
        let text = sample_text("5000", false).replacen("Voltage;20", "Voltage;high", 1);
        let result = parse_spectrum(&text, Path::new("a.csv"));
        assert!(matches!(result, Err(EdxError::MalformedSpectrumFile { .. })));
    }

    #[test]
    fn test_too_few_rows_is_malformed() {
        let text = "Voltage;20\n1;\nTotal;10\n3;\n4;\n5;\n6;\n7;\nEnergy [eV];Counts\n1000;4\n";
        let result = parse_spectrum(text, Path::new("a.csv"));
        assert!(matches!(result, Err(EdxError::MalformedSpectrumFile { .. })));
    }

    #[test]
    fn test_missing_file_is_malformed() {
        let result = read_spectrum(Path::new("/definitely/not/here.csv"));
        assert!(matches!(result, Err(EdxError::MalformedSpectrumFile { .. })));
    }
}
