use super::error::EdxError;
use super::spectrum_reader::RawSpectrum;
use std::path::PathBuf;

const EV_PER_KEV: f64 = 1000.0;

#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct NormalizedPoint {
    pub energy_kev: f64,
    pub counts_per_total: f64,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct NormalizedSpectrum {
    pub source: PathBuf,
    pub points: Vec<NormalizedPoint>,
}

impl NormalizedSpectrum {
    /// Smallest and largest finite energy in keV. `None` when there is none.
    pub fn energy_range(&self) -> Option<(f64, f64)> {
        self.points
            .iter()
            .map(|point| point.energy_kev)
            .filter(|energy| energy.is_finite())
            .fold(None, |range, energy| match range {
                None => Some((energy, energy)),
                Some((min, max)) => Some((f64::min(min, energy), f64::max(max, energy))),
            })
    }
}

pub fn ev_to_kev(energy_ev: f64) -> f64 {
    energy_ev / EV_PER_KEV
}

/// Converts energies to keV and counts to counts per total count.
pub fn normalize(raw: &RawSpectrum) -> Result<NormalizedSpectrum, EdxError> {
    let total_counts = match raw.metadata.total_counts {
        Some(total) if total.is_finite() && total > 0.0 => total,
        other => {
            return Err(EdxError::InvalidMetadata {
                path: raw.source.clone(),
                total_counts: other,
            });
        }
    };

    let points = raw
        .points
        .iter()
        .map(|point| NormalizedPoint {
            energy_kev: ev_to_kev(point.energy_ev),
            counts_per_total: point.counts / total_counts,
        })
        .collect();

    Ok(NormalizedSpectrum {
        source: raw.source.clone(),
        points,
    })
}
