use super::error::EdxError;

/// `max(0, sample - background)` per grid point. A missing background is the
/// all-zero series.
pub fn subtract_background(sample: &[f64], background: Option<&[f64]>) -> Result<Vec<f64>, EdxError> {
    match background {
        Some(background) => {
            if background.len() != sample.len() {
                return Err(EdxError::SeriesLengthMismatch {
                    expected: sample.len(),
                    found: background.len(),
                });
            }

            Ok(sample
                .iter()
                .zip(background.iter())
                .map(|(y, bg)| (y - bg).max(0.0))
                .collect())
        }
        None => Ok(sample.iter().map(|y| y.max(0.0)).collect()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subtraction_clamps_negative() {
        let sample = [0.5, 0.2, 0.0, 1.0];
        let background = [0.1, 0.4, 0.3, 1.0];
        let corrected = subtract_background(&sample, Some(&background)).unwrap();
        assert!((corrected[0] - 0.4).abs() < 1e-12);
        assert_eq!(corrected[1..], [0.0, 0.0, 0.0]);
        assert!(corrected.iter().all(|&y| y >= 0.0));
    }

    #[test]
    fn test_zero_background_is_pass_through() {
        let sample = vec![0.5, 0.2, 0.0, 1.0];
        let zeros = vec![0.0; sample.len()];
        assert_eq!(subtract_background(&sample, Some(&zeros)).unwrap(), sample);
        assert_eq!(subtract_background(&sample, None).unwrap(), sample);
    }

    #[test]
    fn test_correction_is_idempotent() {
        let sample = [0.5, 0.2, 0.7];
        let background = [0.1, 0.4, 0.3];
        let once = subtract_background(&sample, Some(&background)).unwrap();
        let twice = subtract_background(&once, None).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_length_mismatch() {
        let result = subtract_background(&[1.0, 2.0], Some(&[1.0]));
        assert!(matches!(
            result,
            Err(EdxError::SeriesLengthMismatch {
                expected: 2,
                found: 1
            })
        ));
    }
}
