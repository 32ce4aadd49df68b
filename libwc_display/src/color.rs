/// An 8-bit RGB color, independent of any drawing backend
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb(pub u8, pub u8, pub u8);

// Samples of matplotlib's plasma colormap at 0, 1/8, ..., 1
const PLASMA: [(u8, u8, u8); 9] = [
    (13, 8, 135),
    (75, 3, 161),
    (125, 3, 168),
    (168, 34, 150),
    (203, 70, 121),
    (229, 107, 93),
    (248, 148, 65),
    (253, 195, 40),
    (240, 249, 33),
];

/// Map a value in [0, 1] onto the plasma colormap. Values outside are clamped
pub fn plasma(value: f64) -> Rgb {
    let v = if value.is_nan() { 0.0 } else { value.clamp(0.0, 1.0) };
    let scaled = v * (PLASMA.len() - 1) as f64;
    let lower = (scaled.floor() as usize).min(PLASMA.len() - 2);
    let frac = scaled - lower as f64;
    let lerp = |a: u8, b: u8| (a as f64 + (b as f64 - a as f64) * frac).round() as u8;
    let (a, b) = (PLASMA[lower], PLASMA[lower + 1]);
    Rgb(lerp(a.0, b.0), lerp(a.1, b.1), lerp(a.2, b.2))
}

fn median(values: &[f64]) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

fn std_dev(values: &[f64]) -> f64 {
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    (values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n).sqrt()
}

/// Sigmoid color scale centred on the median.
///
/// Raw values go through `1 / (1 + exp(-(v - median) / std))`, which spreads out the
/// bulk of the hits, and the result is stretched to [0, 1] over the fitted sample.
/// A scale fitted on fewer than two values, or on values without spread, is flat and
/// maps everything to the middle of the colormap.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorScale {
    center: f64,
    width: f64,
    low: f64,
    high: f64,
    min: f64,
    max: f64,
}

impl ColorScale {
    pub fn fit(values: &[f64]) -> Self {
        let flat = Self {
            center: 0.0,
            width: 0.0,
            low: 0.0,
            high: 0.0,
            min: 0.0,
            max: 0.0,
        };
        if values.len() < 2 {
            return Self {
                center: values.first().copied().unwrap_or(0.0),
                ..flat
            };
        }
        let center = median(values);
        let width = std_dev(values);
        if !(width > 0.0) || !width.is_finite() {
            return Self { center, ..flat };
        }
        let mut scale = Self {
            center,
            width,
            low: f64::INFINITY,
            high: f64::NEG_INFINITY,
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
        };
        for v in values.iter() {
            let s = scale.sigmoid(*v);
            scale.low = scale.low.min(s);
            scale.high = scale.high.max(s);
            scale.min = scale.min.min(*v);
            scale.max = scale.max.max(*v);
        }
        scale
    }

    pub fn is_flat(&self) -> bool {
        !(self.high > self.low)
    }

    fn sigmoid(&self, value: f64) -> f64 {
        1.0 / (1.0 + (-(value - self.center) / self.width).exp())
    }

    fn inverse_sigmoid(&self, s: f64) -> f64 {
        self.center + self.width * (s / (1.0 - s)).ln()
    }

    /// Position of a raw value on the colormap, in [0, 1]
    pub fn normalize(&self, value: f64) -> f64 {
        if self.is_flat() {
            return 0.5;
        }
        ((self.sigmoid(value) - self.low) / (self.high - self.low)).clamp(0.0, 1.0)
    }

    pub fn color(&self, value: f64) -> Rgb {
        plasma(self.normalize(value))
    }

    /// Evenly spaced colorbar ticks as (position in [0, 1], raw value).
    ///
    /// The end ticks are the fitted extremes. A sigmoid saturated to 0 or 1 has no finite
    /// inverse, so inner ticks are kept within them.
    pub fn ticks(&self, n_ticks: usize) -> Vec<(f64, f64)> {
        if self.is_flat() {
            return vec![(0.5, self.center)];
        }
        (0..n_ticks)
            .map(|i| {
                let t = if n_ticks > 1 {
                    i as f64 / (n_ticks - 1) as f64
                } else {
                    0.5
                };
                let value = if n_ticks > 1 && i == 0 {
                    self.min
                } else if n_ticks > 1 && i + 1 == n_ticks {
                    self.max
                } else {
                    let s = self.low + t * (self.high - self.low);
                    self.inverse_sigmoid(s).clamp(self.min, self.max)
                };
                (t, value)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plasma_ends() {
        assert_eq!(plasma(0.0), Rgb(13, 8, 135));
        assert_eq!(plasma(1.0), Rgb(240, 249, 33));
        assert_eq!(plasma(-3.0), plasma(0.0));
        assert_eq!(plasma(7.0), plasma(1.0));
        assert_eq!(plasma(0.5), Rgb(203, 70, 121));
    }

    #[test]
    fn test_scale_is_monotonic() {
        let values = [0.5, 1.0, 1.2, 2.0, 3.5, 8.0, 40.0];
        let scale = ColorScale::fit(&values);
        assert!(!scale.is_flat());
        assert_eq!(scale.normalize(0.5), 0.0);
        assert_eq!(scale.normalize(40.0), 1.0);
        let mut last = -1.0;
        for v in values.iter() {
            let n = scale.normalize(*v);
            assert!(n > last);
            last = n;
        }
    }

    #[test]
    fn test_flat_scales() {
        assert!(ColorScale::fit(&[]).is_flat());
        assert!(ColorScale::fit(&[4.0]).is_flat());
        let scale = ColorScale::fit(&[2.0, 2.0, 2.0]);
        assert!(scale.is_flat());
        assert_eq!(scale.normalize(2.0), 0.5);
        assert_eq!(scale.ticks(4), vec![(0.5, 2.0)]);
    }

    #[test]
    fn test_ticks_recover_extremes() {
        let values = [-5.0, 0.0, 1.0, 2.0, 10.0];
        let scale = ColorScale::fit(&values);
        let ticks = scale.ticks(4);
        assert_eq!(ticks.len(), 4);
        assert!((ticks[0].1 - -5.0).abs() < 1e-6);
        assert!((ticks[3].1 - 10.0).abs() < 1e-6);
        assert!(ticks.windows(2).all(|w| w[1].1 > w[0].1));
    }

    #[test]
    fn test_ticks_with_saturated_hit() {
        let mut values = vec![1.0; 3000];
        values.extend([0.5, 2.0, 1e4]);
        let scale = ColorScale::fit(&values);
        let ticks = scale.ticks(4);
        assert_eq!(ticks.len(), 4);
        assert!(ticks.iter().all(|(_, value)| value.is_finite()));
        assert_eq!(ticks[0].1, 0.5);
        assert_eq!(ticks[3].1, 1e4);
        assert_eq!(scale.normalize(1e4), 1.0);
    }
}
