//! Corpus-wide feature normalization: fit a distribution per feature, then
//! transform every entity's raw values into `[0,1]`.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use statrs::distribution::{Beta, ContinuousCDF};

use crate::core::featureset::FeatureVector;

/// Which transform a feature uses once fit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NormalizationScheme {
    /// Linear scaling to `[0,1]` using the observed min/max.
    MinMax,
    /// Clip to the 5th/95th percentile, then min-max scale.
    Robust,
    /// Posterior CDF under a Beta fit to the 5/50/95 quantiles.
    Bayesian,
}

/// The fitted distribution summary for one feature across the corpus.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureFit {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
    pub p5: f64,
    pub p50: f64,
    pub p95: f64,
    pub scheme: NormalizationScheme,
}

impl FeatureFit {
    /// Whether the feature has effectively zero variance across the corpus.
    pub fn is_zero_variance(&self) -> bool {
        self.std_dev < f64::EPSILON && (self.max - self.min).abs() < f64::EPSILON
    }

    /// Transform one raw value to `[0,1]` under this fit.
    pub fn transform(&self, value: f64) -> f64 {
        if self.is_zero_variance() {
            return 0.5;
        }
        let result = match self.scheme {
            NormalizationScheme::MinMax => min_max(value, self.min, self.max),
            NormalizationScheme::Robust => min_max(value.clamp(self.p5, self.p95), self.p5, self.p95),
            NormalizationScheme::Bayesian => bayesian_cdf(value, self.p5, self.p50, self.p95),
        };
        result.clamp(0.0, 1.0)
    }
}

fn min_max(value: f64, min: f64, max: f64) -> f64 {
    if (max - min).abs() < f64::EPSILON {
        return 0.5;
    }
    (value - min) / (max - min)
}

/// Fit a Beta distribution to the 5/50/95 quantiles via a crude
/// method-of-moments estimate, then return the posterior CDF at `value`
/// rescaled into the `[p5, p95]` window (values outside the window clamp).
fn bayesian_cdf(value: f64, p5: f64, p50: f64, p95: f64) -> f64 {
    if (p95 - p5).abs() < f64::EPSILON {
        return 0.5;
    }
    // Rescale into (0,1) using the observed spread so Beta's support matches.
    let span = p95 - p5;
    let scaled = ((value - p5) / span).clamp(1e-6, 1.0 - 1e-6);
    let mean = ((p50 - p5) / span).clamp(1e-6, 1.0 - 1e-6);

    // Method-of-moments: pick a concentration that keeps the fitted mean at
    // `mean` while capping variance so alpha/beta stay well away from zero.
    let concentration = 8.0;
    let alpha = (mean * concentration).max(0.5);
    let beta = ((1.0 - mean) * concentration).max(0.5);

    match Beta::new(alpha, beta) {
        Ok(dist) => dist.cdf(scaled),
        Err(_) => scaled,
    }
}

/// Fits a [`FeatureFit`] from a sample of raw values.
pub fn fit_feature(values: &[f64], scheme: NormalizationScheme) -> FeatureFit {
    if values.is_empty() {
        return FeatureFit {
            min: 0.0,
            max: 0.0,
            mean: 0.0,
            std_dev: 0.0,
            p5: 0.0,
            p50: 0.0,
            p95: 0.0,
            scheme,
        };
    }

    let mut sorted: Vec<f64> = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let min = sorted[0];
    let max = sorted[sorted.len() - 1];
    let mean = sorted.iter().sum::<f64>() / sorted.len() as f64;
    let variance = sorted.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / sorted.len() as f64;
    let std_dev = variance.sqrt();

    FeatureFit {
        min,
        max,
        mean,
        std_dev,
        p5: percentile(&sorted, 0.05),
        p50: percentile(&sorted, 0.50),
        p95: percentile(&sorted, 0.95),
        scheme,
    }
}

/// Linear-interpolated percentile over an already-sorted slice.
fn percentile(sorted: &[f64], q: f64) -> f64 {
    if sorted.len() == 1 {
        return sorted[0];
    }
    let rank = q * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    if lower == upper {
        sorted[lower]
    } else {
        let frac = rank - lower as f64;
        sorted[lower] * (1.0 - frac) + sorted[upper] * frac
    }
}

/// Fits one [`FeatureFit`] per feature name and transforms every vector's raw
/// values into `normalized`, in place.
///
/// `schemes` maps feature name to its [`NormalizationScheme`]; features
/// absent from the map default to [`NormalizationScheme::MinMax`].
pub fn normalize_corpus(
    vectors: &mut [FeatureVector],
    feature_names: &[String],
    schemes: &HashMap<String, NormalizationScheme>,
) -> HashMap<String, FeatureFit> {
    let mut fits = HashMap::new();

    for name in feature_names {
        let scheme = schemes.get(name).copied().unwrap_or(NormalizationScheme::MinMax);
        let values: Vec<f64> = vectors.iter().filter_map(|v| v.raw.get(name).copied()).collect();
        let fit = fit_feature(&values, scheme);
        fits.insert(name.clone(), fit);
    }

    for vector in vectors.iter_mut() {
        for name in feature_names {
            let raw = vector.raw.get(name).copied().unwrap_or(0.0);
            let fit = &fits[name];
            vector.normalized.insert(name.clone(), fit.transform(raw));
        }
    }

    fits
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_variance_maps_to_half() {
        let values = vec![1.0; 20];
        let fit = fit_feature(&values, NormalizationScheme::Bayesian);
        assert!(fit.is_zero_variance());
        for v in &values {
            assert_eq!(fit.transform(*v), 0.5);
        }
    }

    #[test]
    fn min_max_bounds_to_unit_interval() {
        let values: Vec<f64> = (0..=100).map(|v| v as f64).collect();
        let fit = fit_feature(&values, NormalizationScheme::MinMax);
        assert_eq!(fit.transform(0.0), 0.0);
        assert_eq!(fit.transform(100.0), 1.0);
        assert!((fit.transform(50.0) - 0.5).abs() < 1e-9);
    }

    #[test]
    fn robust_clips_outliers_into_range() {
        let mut values: Vec<f64> = (1..=98).map(|v| v as f64).collect();
        values.push(10_000.0);
        values.push(-10_000.0);
        let fit = fit_feature(&values, NormalizationScheme::Robust);
        assert_eq!(fit.transform(10_000.0), 1.0);
        assert_eq!(fit.transform(-10_000.0), 0.0);
    }

    #[test]
    fn every_transformed_value_is_within_unit_interval() {
        let values = vec![1.0, 5.0, 2.0, 9.0, 100.0, 3.0, 0.0, 42.0];
        for scheme in [
            NormalizationScheme::MinMax,
            NormalizationScheme::Robust,
            NormalizationScheme::Bayesian,
        ] {
            let fit = fit_feature(&values, scheme);
            for v in &values {
                let n = fit.transform(*v);
                assert!((0.0..=1.0).contains(&n), "{n} out of range for {scheme:?}");
            }
        }
    }

    #[test]
    fn bayesian_median_transforms_near_one_half() {
        let values: Vec<f64> = (1..=99).map(|v| v as f64).collect();
        let fit = fit_feature(&values, NormalizationScheme::Bayesian);
        let median_norm = fit.transform(fit.p50);
        assert!((median_norm - 0.5).abs() < 0.15, "median normalized to {median_norm}");
    }
}
