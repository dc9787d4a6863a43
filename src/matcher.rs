use super::normalizer::ev_to_kev;
use super::reference::ReferenceTable;

pub const DEFAULT_TOLERANCE_KEV: f64 = 0.126;
pub const DEFAULT_MIN_PEAKS_REQUIRED: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct MatchSettings {
    pub tolerance_kev: f64,
    pub min_peaks_required: usize,
}

impl Default for MatchSettings {
    fn default() -> Self {
        MatchSettings {
            tolerance_kev: DEFAULT_TOLERANCE_KEV,
            min_peaks_required: DEFAULT_MIN_PEAKS_REQUIRED,
        }
    }
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ElementMatch {
    pub element: String,
    pub matched_peaks: usize,
    pub total_reference_peaks: usize,
    pub score: f64,
}

/// A reference line is matched when some peak lies strictly closer than
/// `tolerance_kev`.
pub fn line_is_matched(line_kev: f64, peak_energies_kev: &[f64], tolerance_kev: f64) -> bool {
    peak_energies_kev
        .iter()
        .any(|peak| (peak - line_kev).abs() < tolerance_kev)
}

/// Number of `lines_ev` matched by at least one peak. Lines are tested
/// independently, so one peak can match several lines.
pub fn count_matched_lines(lines_ev: &[f64], peak_energies_kev: &[f64], tolerance_kev: f64) -> usize {
    lines_ev
        .iter()
        .filter(|&&line| line_is_matched(ev_to_kev(line), peak_energies_kev, tolerance_kev))
        .count()
}

/// Scores every element of `table` and keeps those with at least
/// `min_peaks_required` matched lines, in table order.
pub fn match_elements(
    peak_energies_kev: &[f64],
    table: &ReferenceTable,
    settings: &MatchSettings,
) -> Vec<ElementMatch> {
    table
        .iter()
        .filter(|(_, lines)| !lines.is_empty())
        .filter_map(|(element, lines)| {
            let matched_peaks = count_matched_lines(lines, peak_energies_kev, settings.tolerance_kev);
            if matched_peaks < settings.min_peaks_required {
                return None;
            }

            let total_reference_peaks = lines.len();
            log::debug!(
                "{}: {} of {} reference lines matched",
                element,
                matched_peaks,
                total_reference_peaks
            );
            Some(ElementMatch {
                element: element.to_owned(),
                matched_peaks,
                total_reference_peaks,
                score: matched_peaks as f64 / total_reference_peaks as f64,
            })
        })
        .collect()
}

pub fn detected_elements(matches: &[ElementMatch]) -> Vec<String> {
    matches.iter().map(|m| m.element.clone()).collect()
}
