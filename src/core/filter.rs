//! Zero-phase Butterworth filtering.
//!
//! Filters are built as cascades of second-order sections from the bilinear
//! transform with pre-warped corners. Band-pass filters cascade a high-pass
//! at the lower corner with a low-pass at the upper one. [`Butterworth::filtfilt`]
//! runs the cascade forward and backward so the result has no phase shift.

use crate::error::ConfigError;
use crate::params::windowing::BandFilter;
use std::f64::consts::PI;

/// One biquad in transposed direct form II.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Section {
    b: [f64; 3],
    a: [f64; 3],
}

impl Section {
    fn lowpass(k: f64, q: f64) -> Self {
        let norm = 1.0 / (1.0 + k / q + k * k);
        let b0 = k * k * norm;
        Self {
            b: [b0, 2.0 * b0, b0],
            a: [1.0, 2.0 * (k * k - 1.0) * norm, (1.0 - k / q + k * k) * norm],
        }
    }

    fn highpass(k: f64, q: f64) -> Self {
        let norm = 1.0 / (1.0 + k / q + k * k);
        Self {
            b: [norm, -2.0 * norm, norm],
            a: [1.0, 2.0 * (k * k - 1.0) * norm, (1.0 - k / q + k * k) * norm],
        }
    }

    fn lowpass_first_order(k: f64) -> Self {
        let norm = 1.0 / (1.0 + k);
        Self {
            b: [k * norm, k * norm, 0.0],
            a: [1.0, (k - 1.0) * norm, 0.0],
        }
    }

    fn highpass_first_order(k: f64) -> Self {
        let norm = 1.0 / (1.0 + k);
        Self {
            b: [norm, -norm, 0.0],
            a: [1.0, (k - 1.0) * norm, 0.0],
        }
    }

    /// Gain for a constant input.
    fn dc_gain(&self) -> f64 {
        let den = self.a.iter().sum::<f64>();
        if den.abs() < f64::EPSILON {
            0.0
        } else {
            self.b.iter().sum::<f64>() / den
        }
    }

    /// Filter in place, starting from the steady state of `data[0]`.
    fn run(&self, data: &mut [f64]) {
        let Some(&first) = data.first() else {
            return;
        };
        let [b0, b1, b2] = self.b;
        let [_, a1, a2] = self.a;

        let settled = first * self.dc_gain();
        let mut z1 = settled - b0 * first;
        let mut z2 = b2 * first - a2 * settled;

        for x in data.iter_mut() {
            let input = *x;
            let y = b0 * input + z1;
            z1 = b1 * input - a1 * y + z2;
            z2 = b2 * input - a2 * y;
            *x = y;
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pass {
    Low,
    High,
}

/// A Butterworth low-, high- or band-pass filter for one sampling frequency.
#[derive(Debug, Clone, PartialEq)]
pub struct Butterworth {
    sections: Vec<Section>,
}

impl Butterworth {
    /// Design the filter described by `band` for signals sampled at `fs`.
    ///
    /// Returns `Ok(None)` when `band` has no corner frequency.
    pub fn design(band: &BandFilter, fs: f64) -> Result<Option<Self>, ConfigError> {
        if band.order == 0 {
            return Err(ConfigError::Filter("order must be at least 1".into()));
        }
        let nyquist = fs / 2.0;
        for corner in [band.min_frequency, band.max_frequency].into_iter().flatten() {
            if !(corner > 0.0 && corner < nyquist) {
                return Err(ConfigError::Filter(format!(
                    "corner {corner} Hz must lie within (0, {nyquist}) Hz"
                )));
            }
        }

        let mut sections = Vec::new();
        match (band.min_frequency, band.max_frequency) {
            (None, None) => return Ok(None),
            (Some(low), Some(high)) if low >= high => {
                return Err(ConfigError::Filter(format!(
                    "lower corner {low} Hz is not below upper corner {high} Hz"
                )));
            }
            (low, high) => {
                if let Some(low) = low {
                    sections.extend(cascade(Pass::High, low, fs, band.order));
                }
                if let Some(high) = high {
                    sections.extend(cascade(Pass::Low, high, fs, band.order));
                }
            }
        }
        Ok(Some(Self { sections }))
    }

    /// Filter forward then backward.
    pub fn filtfilt(&self, samples: &[f64]) -> Vec<f64> {
        let mut data = samples.to_vec();
        for section in &self.sections {
            section.run(&mut data);
        }
        data.reverse();
        for section in &self.sections {
            section.run(&mut data);
        }
        data.reverse();
        data
    }
}

fn cascade(pass: Pass, corner: f64, fs: f64, order: usize) -> Vec<Section> {
    let k = (PI * corner / fs).tan();
    let mut sections = Vec::with_capacity(order / 2 + 1);
    for i in 0..order / 2 {
        // Angle of the pole pair from the negative real axis.
        let angle = PI * (order - 1 - 2 * i) as f64 / (2 * order) as f64;
        let q = 1.0 / (2.0 * angle.cos());
        sections.push(match pass {
            Pass::Low => Section::lowpass(k, q),
            Pass::High => Section::highpass(k, q),
        });
    }
    if order % 2 == 1 {
        sections.push(match pass {
            Pass::Low => Section::lowpass_first_order(k),
            Pass::High => Section::highpass_first_order(k),
        });
    }
    sections
}

#[cfg(test)]
mod tests {
    use super::*;

    fn band(min: Option<f64>, max: Option<f64>) -> BandFilter {
        BandFilter {
            min_frequency: min,
            max_frequency: max,
            order: 5,
        }
    }

    fn sine(frequency: f64, fs: f64, n: usize) -> Vec<f64> {
        (0..n)
            .map(|i| (2.0 * PI * frequency * i as f64 / fs).sin())
            .collect()
    }

    fn rms(samples: &[f64]) -> f64 {
        (samples.iter().map(|x| x * x).sum::<f64>() / samples.len() as f64).sqrt()
    }

    #[test]
    fn test_no_corners_means_no_filter() {
        assert_eq!(Butterworth::design(&band(None, None), 100.0), Ok(None));
    }

    #[test]
    fn test_corner_above_nyquist_is_rejected() {
        assert!(matches!(
            Butterworth::design(&band(None, Some(60.0)), 100.0),
            Err(ConfigError::Filter(_))
        ));
        assert!(matches!(
            Butterworth::design(&band(Some(10.0), Some(5.0)), 100.0),
            Err(ConfigError::Filter(_))
        ));
    }

    #[test]
    fn test_lowpass_keeps_dc() {
        let filter = Butterworth::design(&band(None, Some(5.0)), 100.0)
            .unwrap()
            .unwrap();
        let out = filter.filtfilt(&[3.0; 500]);
        assert!(out.iter().all(|x| (x - 3.0).abs() < 1e-9));
    }

    #[test]
    fn test_highpass_removes_dc() {
        let filter = Butterworth::design(&band(Some(1.0), None), 100.0)
            .unwrap()
            .unwrap();
        let out = filter.filtfilt(&[3.0; 500]);
        assert!(out.iter().all(|x| x.abs() < 1e-9));
    }

    #[test]
    fn test_bandpass_attenuates_out_of_band() {
        let fs = 100.0;
        let filter = Butterworth::design(&band(Some(2.0), Some(8.0)), fs)
            .unwrap()
            .unwrap();

        let inside = filter.filtfilt(&sine(4.0, fs, 2000));
        let below = filter.filtfilt(&sine(0.2, fs, 2000));
        let above = filter.filtfilt(&sine(30.0, fs, 2000));

        // Ignore the edges, where the response settles.
        let mid = 500..1500;
        assert!(rms(&inside[mid.clone()]) > 0.6);
        assert!(rms(&below[mid.clone()]) < 0.01);
        assert!(rms(&above[mid]) < 0.01);
    }

    #[test]
    fn test_even_order_sections() {
        let mut b = band(None, Some(5.0));
        b.order = 4;
        let filter = Butterworth::design(&b, 100.0).unwrap().unwrap();
        assert_eq!(filter.sections.len(), 2);

        b.order = 5;
        let filter = Butterworth::design(&b, 100.0).unwrap().unwrap();
        assert_eq!(filter.sections.len(), 3);
    }
}
