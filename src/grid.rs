use super::error::EdxError;
use super::normalizer::NormalizedSpectrum;

pub const DEFAULT_GRID_POINTS: usize = 1000;

/// Evenly spaced energy axis (keV) shared by every spectrum of a run.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "GridEnergies")]
pub struct CommonGrid {
    energies: Vec<f64>,
}

#[derive(serde::Deserialize)]
struct GridEnergies {
    energies: Vec<f64>,
}

impl TryFrom<GridEnergies> for CommonGrid {
    type Error = EdxError;

    /// Accepts at least two finite, strictly increasing energies.
    fn try_from(value: GridEnergies) -> Result<Self, Self::Error> {
        let energies = value.energies;
        let points = energies.len();
        let min = energies.first().copied().unwrap_or(f64::NAN);
        let max = energies.last().copied().unwrap_or(f64::NAN);
        let increasing = energies.windows(2).all(|pair| pair[0] < pair[1]);
        if points < 2 || !increasing || energies.iter().any(|energy| !energy.is_finite()) {
            return Err(EdxError::InvalidGrid { min, max, points });
        }
        Ok(CommonGrid { energies })
    }
}

impl CommonGrid {
    pub fn linspace(min: f64, max: f64, points: usize) -> Result<Self, EdxError> {
        if points < 2 || !min.is_finite() || !max.is_finite() || min >= max {
            return Err(EdxError::InvalidGrid { min, max, points });
        }

        let step = (max - min) / (points - 1) as f64;
        let mut energies: Vec<f64> = (0..points).map(|i| min + i as f64 * step).collect();
        // keep the upper endpoint exact
        energies[points - 1] = max;

        Ok(CommonGrid { energies })
    }

    /// Builds the grid over the union energy range of all `spectra`.
    pub fn spanning(spectra: &[NormalizedSpectrum], points: usize) -> Result<Self, EdxError> {
        let (min, max) = spectra
            .iter()
            .filter_map(NormalizedSpectrum::energy_range)
            .reduce(|(min_a, max_a), (min_b, max_b)| (min_a.min(min_b), max_a.max(max_b)))
            .ok_or(EdxError::EmptyResultSet)?;

        log::info!(
            "Common energy grid: {} points over [{:.4}, {:.4}] keV",
            points,
            min,
            max
        );
        Self::linspace(min, max, points)
    }

    pub fn energies(&self) -> &[f64] {
        &self.energies
    }

    pub fn len(&self) -> usize {
        self.energies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.energies.is_empty()
    }

    pub fn range(&self) -> (f64, f64) {
        (self.energies[0], self.energies[self.energies.len() - 1])
    }

    pub fn step(&self) -> f64 {
        let (min, max) = self.range();
        (max - min) / (self.len() - 1) as f64
    }

    /// Index of the grid point closest to `energy`, clamped to the grid.
    pub fn nearest_index(&self, energy: f64) -> usize {
        let (min, _) = self.range();
        let position = ((energy - min) / self.step()).round();
        if position.is_nan() || position <= 0.0 {
            0
        } else {
            (position as usize).min(self.len() - 1)
        }
    }
}

/// Sorted interpolation knots; samples sharing an energy are averaged.
fn knots(spectrum: &NormalizedSpectrum) -> Vec<(f64, f64)> {
    let mut sorted: Vec<(f64, f64)> = spectrum
        .points
        .iter()
        .filter(|p| p.energy_kev.is_finite() && p.counts_per_total.is_finite())
        .map(|p| (p.energy_kev, p.counts_per_total))
        .collect();
    sorted.sort_by(|a, b| a.0.total_cmp(&b.0));

    let mut knots: Vec<(f64, f64)> = Vec::with_capacity(sorted.len());
    let mut run_len = 0.0;
    for (energy, counts) in sorted {
        match knots.last_mut() {
            Some(last) if last.0 == energy => {
                run_len += 1.0;
                last.1 += (counts - last.1) / run_len;
            }
            _ => {
                knots.push((energy, counts));
                run_len = 1.0;
            }
        }
    }
    knots
}

fn interpolate(knots: &[(f64, f64)], x: f64) -> f64 {
    let (Some(first), Some(last)) = (knots.first(), knots.last()) else {
        return 0.0;
    };
    if x < first.0 || x > last.0 {
        return 0.0;
    }

    // first knot with energy >= x
    let upper = knots.partition_point(|knot| knot.0 < x);
    let (x1, y1) = knots[upper];
    if x1 == x || upper == 0 {
        return y1;
    }

    let (x0, y0) = knots[upper - 1];
    y0 + (y1 - y0) * (x - x0) / (x1 - x0)
}

/// Resamples `spectrum` onto `grid` with piecewise-linear interpolation.
/// Grid points outside the spectrum's energy domain are exactly zero.
pub fn resample(spectrum: &NormalizedSpectrum, grid: &CommonGrid) -> Vec<f64> {
    let knots = knots(spectrum);
    grid.energies()
        .iter()
        .map(|&energy| interpolate(&knots, energy))
        .collect()
}
