use find_peaks::PeakFinder;

use super::grid::CommonGrid;

/// Middle index of the flat top containing `index`, provided the top has a
/// strictly lower neighbour on both sides.
fn interior_peak(y_data: &[f64], index: usize) -> Option<usize> {
    let value = *y_data.get(index)?;
    let mut left = index;
    while left > 0 && y_data[left - 1] == value {
        left -= 1;
    }
    let mut right = index;
    while right + 1 < y_data.len() && y_data[right + 1] == value {
        right += 1;
    }

    let lower_left = left > 0 && y_data[left - 1] < value;
    let lower_right = right + 1 < y_data.len() && y_data[right + 1] < value;
    (lower_left && lower_right).then_some(left + (right - left) / 2)
}

#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct DetectedPeak {
    pub index: usize,
    pub energy_kev: f64,
    pub counts: f64,
}

/// Optional filters on top of plain local-maximum detection. Every filter is
/// off by default, so any local maximum counts as a peak.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct PeakFindingSettings {
    pub min_height: Option<f64>,
    pub min_prominence: Option<f64>,
    pub min_distance: Option<usize>,
}

impl PeakFindingSettings {
    /// Grid indices of the local maxima of `y_data`, ascending. A flat top is
    /// reported once at its middle index; the two end points never qualify.
    pub fn find_peak_indices(&self, y_data: &[f64]) -> Vec<usize> {
        if y_data.len() < 3 {
            return Vec::new();
        }

        let mut peak_finder = PeakFinder::new(y_data);

        if let Some(min_height) = self.min_height {
            peak_finder.with_min_height(min_height);
        }

        if let Some(min_prominence) = self.min_prominence {
            peak_finder.with_min_prominence(min_prominence);
        }

        if let Some(min_distance) = self.min_distance {
            peak_finder.with_min_distance(min_distance);
        }

        let mut indices: Vec<usize> = peak_finder
            .find_peaks()
            .iter()
            .filter_map(|peak| interior_peak(y_data, peak.middle_position()))
            .collect();
        indices.sort_unstable();
        indices.dedup();
        indices
    }

    pub fn find_peaks(&self, y_data: &[f64], grid: &CommonGrid) -> Vec<DetectedPeak> {
        let energies = grid.energies();
        self.find_peak_indices(y_data)
            .into_iter()
            .filter(|&index| index < energies.len())
            .map(|index| DetectedPeak {
                index,
                energy_kev: energies[index],
                counts: y_data[index],
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_maxima() {
        let y = [0.0, 1.0, 0.0, 0.5, 3.0, 0.5, 0.0, 2.0, 0.0];
        let indices = PeakFindingSettings::default().find_peak_indices(&y);
        assert_eq!(indices, vec![1, 4, 7]);
    }

    #[test]
    fn test_edges_are_not_peaks() {
        let y = [5.0, 1.0, 0.0, 1.0, 0.0, 1.0, 5.0];
        let indices = PeakFindingSettings::default().find_peak_indices(&y);
        assert_eq!(indices, vec![3]);
    }

    #[test]
    fn test_edge_plateaus_are_not_peaks() {
        let falling = [3.0, 3.0, 3.0, 3.0, 2.0, 1.0, 0.0, 0.0, 0.0];
        let rising: Vec<f64> = falling.iter().rev().copied().collect();
        let settings = PeakFindingSettings::default();
        assert!(settings.find_peak_indices(&falling).is_empty());
        assert!(settings.find_peak_indices(&rising).is_empty());
    }

    #[test]
    fn test_interior_plateau_reported_at_middle() {
        let y = [0.0, 1.0, 2.0, 2.0, 2.0, 1.0, 0.0];
        assert_eq!(PeakFindingSettings::default().find_peak_indices(&y), vec![3]);
        assert_eq!(interior_peak(&y, 2), Some(3));
        assert_eq!(interior_peak(&y, 0), None);
    }

    #[test]
    fn test_min_prominence_and_distance() {
        let y = [
            0.0, 0.0, 1.0, 0.0, 3.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 2.0, 0.0, 0.0,
        ];
        assert_eq!(
            PeakFindingSettings::default().find_peak_indices(&y),
            vec![2, 4, 12]
        );

        let prominent = PeakFindingSettings {
            min_prominence: Some(1.5),
            ..Default::default()
        };
        assert_eq!(prominent.find_peak_indices(&y), vec![4, 12]);

        let spaced = PeakFindingSettings {
            min_distance: Some(3),
            ..Default::default()
        };
        assert_eq!(spaced.find_peak_indices(&y), vec![4, 12]);
    }

    #[test]
    fn test_min_height_filters_small_peaks() {
        let y = [0.0, 1.0, 0.0, 0.5, 3.0, 0.5, 0.0, 2.0, 0.0];
        let settings = PeakFindingSettings {
            min_height: Some(1.5),
            ..Default::default()
        };
        let indices = settings.find_peak_indices(&y);
        assert_eq!(indices, vec![4, 7]);
    }

    #[test]
    fn test_flat_series_has_no_peaks() {
        let y = [0.0; 20];
        assert!(PeakFindingSettings::default().find_peak_indices(&y).is_empty());
    }

    #[test]
    fn test_peaks_carry_grid_energy() {
        let grid = CommonGrid::linspace(0.0, 8.0, 9).unwrap();
        let y = [0.0, 1.0, 0.0, 0.5, 3.0, 0.5, 0.0, 2.0, 0.0];
        let peaks = PeakFindingSettings::default().find_peaks(&y, &grid);
        assert_eq!(peaks.len(), 3);
        assert_eq!(peaks[1].index, 4);
        assert_eq!(peaks[1].energy_kev, 4.0);
        assert_eq!(peaks[1].counts, 3.0);
    }
}
