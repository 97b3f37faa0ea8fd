//! Frequency sampling, window tapers and spectral smoothing.
//!
//! These are driven by the same parameter block as the windowing itself and
//! describe how each selected window is prepared for spectral analysis.

use crate::error::ConfigError;
use crate::params::types::{FrequencySampling, SmoothingType, WindowShape};
use crate::params::windowing::{FrequencyRange, Smoothing, Taper};
use std::f64::consts::PI;

/// Upper bound on generated frequency samples.
const MAX_FREQUENCY_SAMPLES: usize = 100_000;

/// Frequencies at which spectra are evaluated.
///
/// A positive sample count takes precedence; otherwise `step` is used, as an
/// increment for linear sampling or as a ratio for log sampling.
pub fn frequency_grid(range: &FrequencyRange) -> Result<Vec<f64>, ConfigError> {
    let FrequencyRange {
        min, max, sampling, ..
    } = *range;

    if !(min.is_finite() && max.is_finite()) || max <= min {
        return Err(ConfigError::Frequency(format!(
            "minimum {min} Hz must be below maximum {max} Hz"
        )));
    }
    if sampling == FrequencySampling::Log && min <= 0.0 {
        return Err(ConfigError::Frequency(format!(
            "log sampling needs a positive minimum, got {min} Hz"
        )));
    }
    if min < 0.0 {
        return Err(ConfigError::Frequency(format!(
            "negative minimum frequency {min} Hz"
        )));
    }

    if range.count > 0 {
        if range.count > MAX_FREQUENCY_SAMPLES {
            return Err(ConfigError::Frequency(format!(
                "{} samples exceeds the limit of {MAX_FREQUENCY_SAMPLES}",
                range.count
            )));
        }
        if range.count == 1 {
            return Ok(vec![min]);
        }
        let last = (range.count - 1) as f64;
        let grid = (0..range.count)
            .map(|i| {
                let t = i as f64 / last;
                match sampling {
                    FrequencySampling::Log => min * (max / min).powf(t),
                    FrequencySampling::Linear => min + (max - min) * t,
                }
            })
            .collect();
        return Ok(grid);
    }

    let step = range.step;
    let valid_step = match sampling {
        FrequencySampling::Log => step > 1.0,
        FrequencySampling::Linear => step > 0.0,
    };
    if !(step.is_finite() && valid_step) {
        return Err(ConfigError::Frequency(format!(
            "invalid {sampling} step {step}"
        )));
    }

    let mut grid = Vec::new();
    let limit = max * (1.0 + 1e-12);
    for i in 0.. {
        let f = match sampling {
            FrequencySampling::Log => min * step.powi(i),
            FrequencySampling::Linear => min + step * f64::from(i),
        };
        if f > limit {
            break;
        }
        if grid.len() == MAX_FREQUENCY_SAMPLES {
            return Err(ConfigError::Frequency(format!(
                "step {step} produces more than {MAX_FREQUENCY_SAMPLES} samples"
            )));
        }
        grid.push(f);
    }
    Ok(grid)
}

/// Taper coefficients for a window of `n` samples.
pub fn taper(taper: &Taper, n: usize) -> Vec<f64> {
    let mut coefficients = match n {
        0 => Vec::new(),
        1 => vec![1.0],
        _ => {
            let last = (n - 1) as f64;
            (0..n)
                .map(|i| shape_at(taper.shape, taper.alpha, i as f64 / last))
                .collect()
        }
    };
    if taper.reversed {
        for c in &mut coefficients {
            *c = 1.0 - *c;
        }
    }
    coefficients
}

/// Coefficient at relative position `x` in `[0, 1]`.
fn shape_at(shape: WindowShape, alpha: f64, x: f64) -> f64 {
    match shape {
        WindowShape::Rectangular => 1.0,
        WindowShape::Hann => 0.5 - 0.5 * (2.0 * PI * x).cos(),
        WindowShape::Hamming => 0.54 - 0.46 * (2.0 * PI * x).cos(),
        WindowShape::Cosine => (PI * x).sin(),
        WindowShape::Tukey => {
            if alpha <= 0.0 {
                1.0
            } else if alpha >= 1.0 {
                shape_at(WindowShape::Hann, alpha, x)
            } else if x < alpha / 2.0 {
                0.5 * (1.0 + (PI * (2.0 * x / alpha - 1.0)).cos())
            } else if x > 1.0 - alpha / 2.0 {
                0.5 * (1.0 + (PI * (2.0 * x / alpha - 2.0 / alpha + 1.0)).cos())
            } else {
                1.0
            }
        }
    }
}

/// Konno-Ohmachi weight of frequency `f` around centre `fc`.
pub fn konno_ohmachi_weight(f: f64, fc: f64, b: f64) -> f64 {
    if f <= 0.0 || fc <= 0.0 {
        return 0.0;
    }
    let x = b * (f / fc).log10();
    if x.abs() < 1e-12 {
        1.0
    } else {
        (x.sin() / x).powi(4)
    }
}

/// Smooth an amplitude spectrum sampled at `frequencies`.
pub fn smooth(
    smoothing: &Smoothing,
    frequencies: &[f64],
    amplitudes: &[f64],
) -> Result<Vec<f64>, ConfigError> {
    if frequencies.len() != amplitudes.len() {
        return Err(ConfigError::Frequency(format!(
            "{} frequencies but {} amplitudes",
            frequencies.len(),
            amplitudes.len()
        )));
    }

    let smoothed = match smoothing.kind {
        SmoothingType::NoSmoothing => amplitudes.to_vec(),
        SmoothingType::KonnoOhmachi => weighted(frequencies, amplitudes, |f, fc| {
            konno_ohmachi_weight(f, fc, smoothing.constant)
        }),
        SmoothingType::Constant => {
            let half = smoothing.width / 2.0;
            weighted(frequencies, amplitudes, |f, fc| {
                if (f - fc).abs() <= half {
                    1.0
                } else {
                    0.0
                }
            })
        }
        SmoothingType::Proportional => {
            let half = smoothing.width / 2.0;
            weighted(frequencies, amplitudes, |f, fc| {
                if (f - fc).abs() <= half * fc {
                    1.0
                } else {
                    0.0
                }
            })
        }
    };
    Ok(smoothed)
}

fn weighted(frequencies: &[f64], amplitudes: &[f64], weight: impl Fn(f64, f64) -> f64) -> Vec<f64> {
    frequencies
        .iter()
        .zip(amplitudes)
        .map(|(&fc, &own)| {
            let (sum, norm) = frequencies
                .iter()
                .zip(amplitudes)
                .fold((0.0, 0.0), |(sum, norm), (&f, &a)| {
                    let w = weight(f, fc);
                    (sum + w * a, norm + w)
                });
            if norm > 0.0 {
                sum / norm
            } else {
                own
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn range(sampling: FrequencySampling, count: usize, step: f64) -> FrequencyRange {
        FrequencyRange {
            min: 0.5,
            max: 50.0,
            sampling,
            count,
            step,
        }
    }

    #[test]
    fn test_log_grid_by_count() {
        let grid = frequency_grid(&range(FrequencySampling::Log, 3, 0.0)).unwrap();
        assert_eq!(grid.len(), 3);
        assert!((grid[0] - 0.5).abs() < 1e-12);
        assert!((grid[1] - 5.0).abs() < 1e-9);
        assert!((grid[2] - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_linear_grid_by_step() {
        let mut r = range(FrequencySampling::Linear, 0, 12.5);
        r.min = 0.0;
        let grid = frequency_grid(&r).unwrap();
        assert_eq!(grid, vec![0.0, 12.5, 25.0, 37.5, 50.0]);
    }

    #[test]
    fn test_log_grid_by_ratio() {
        let grid = frequency_grid(&range(FrequencySampling::Log, 0, 10.0)).unwrap();
        assert_eq!(grid.len(), 3);
        assert!((grid[2] - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_invalid_grids() {
        let mut r = range(FrequencySampling::Log, 10, 0.0);
        r.min = 0.0;
        assert!(frequency_grid(&r).is_err());

        let r = range(FrequencySampling::Log, 0, 1.0);
        assert!(frequency_grid(&r).is_err());

        let mut r = range(FrequencySampling::Linear, 10, 0.0);
        r.max = 0.1;
        assert!(frequency_grid(&r).is_err());
    }

    #[test]
    fn test_tukey_taper() {
        let t = Taper {
            shape: WindowShape::Tukey,
            reversed: false,
            alpha: 0.5,
        };
        let w = taper(&t, 101);
        assert!(w[0].abs() < 1e-12);
        assert!(w[100].abs() < 1e-12);
        assert_eq!(w[50], 1.0);
        assert!((w[12] - 0.5).abs() < 0.05);
        for i in 0..101 {
            assert!((w[i] - w[100 - i]).abs() < 1e-12);
        }
    }

    #[test]
    fn test_reversed_taper() {
        let t = Taper {
            shape: WindowShape::Hann,
            reversed: true,
            alpha: 0.0,
        };
        let w = taper(&t, 3);
        assert!((w[0] - 1.0).abs() < 1e-12);
        assert!(w[1].abs() < 1e-12);
    }

    #[test]
    fn test_konno_ohmachi_weight() {
        assert_eq!(konno_ohmachi_weight(2.0, 2.0, 40.0), 1.0);
        let near = konno_ohmachi_weight(2.1, 2.0, 40.0);
        let far = konno_ohmachi_weight(4.0, 2.0, 40.0);
        assert!(near > far);
        assert_eq!(konno_ohmachi_weight(0.0, 2.0, 40.0), 0.0);
    }

    #[test]
    fn test_smoothing_flat_spectrum_is_unchanged() {
        let freqs: Vec<f64> = (1..50).map(|i| i as f64 * 0.5).collect();
        let amps = vec![3.0; freqs.len()];
        let s = Smoothing {
            method: crate::params::types::SmoothingMethod::Function,
            kind: SmoothingType::KonnoOhmachi,
            constant: 40.0,
            width: 0.1,
        };
        let smoothed = smooth(&s, &freqs, &amps).unwrap();
        assert!(smoothed.iter().all(|a| (a - 3.0).abs() < 1e-9));

        assert!(smooth(&s, &freqs, &amps[1..]).is_err());
    }

    #[test]
    fn test_constant_smoothing_averages_neighbours() {
        let freqs = [1.0, 2.0, 3.0];
        let amps = [0.0, 3.0, 6.0];
        let s = Smoothing {
            method: crate::params::types::SmoothingMethod::Function,
            kind: SmoothingType::Constant,
            constant: 0.0,
            width: 2.0,
        };
        assert_eq!(smooth(&s, &freqs, &amps).unwrap(), vec![1.5, 3.0, 4.5]);
    }
}
