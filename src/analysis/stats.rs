use serde::Serialize;

use crate::models::errors::AnalysisError;

pub const WEI_PER_GWEI: f64 = 1e9;

pub fn to_gwei(wei: u128) -> f64 {
    wei as f64 / WEI_PER_GWEI
}

pub(crate) fn require(statistic: &'static str, required: usize, actual: usize) -> Result<(), AnalysisError> {
    if actual < required {
        return Err(AnalysisError::InsufficientData {
            statistic,
            required,
            actual,
        });
    }
    Ok(())
}

pub fn mean(statistic: &'static str, samples: &[f64]) -> Result<f64, AnalysisError> {
    require(statistic, 1, samples.len())?;
    Ok(samples.iter().sum::<f64>() / samples.len() as f64)
}

pub fn median(statistic: &'static str, samples: &[f64]) -> Result<f64, AnalysisError> {
    require(statistic, 1, samples.len())?;
    let mut sorted = samples.to_vec();
    sorted.sort_by(f64::total_cmp);

    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Ok((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Ok(sorted[mid])
    }
}

/// Sample standard deviation (n - 1 denominator).
pub fn stdev(statistic: &'static str, samples: &[f64]) -> Result<f64, AnalysisError> {
    require(statistic, 2, samples.len())?;
    let mean = mean(statistic, samples)?;
    let variance = samples.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (samples.len() - 1) as f64;
    Ok(variance.sqrt())
}

/// Percentage of `count` in `total`, undefined for an empty total.
pub fn share(count: usize, total: usize) -> Option<f64> {
    (total > 0).then(|| count as f64 / total as f64 * 100.0)
}

/// Percentage change from `from` to `to`, undefined when `from` is zero.
pub fn percent_change(from: f64, to: f64) -> Option<f64> {
    (from != 0.0).then(|| (to - from) / from * 100.0)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub count: usize,
    pub mean: f64,
    pub median: f64,
    pub min: f64,
    pub max: f64,
    pub stdev: f64,
}

impl Summary {
    /// Needs at least two samples, since the standard deviation is undefined below that.
    pub fn from_samples(statistic: &'static str, samples: &[f64]) -> Result<Self, AnalysisError> {
        require(statistic, 2, samples.len())?;
        Ok(Self {
            count: samples.len(),
            mean: mean(statistic, samples)?,
            median: median(statistic, samples)?,
            min: samples.iter().copied().fold(f64::INFINITY, f64::min),
            max: samples.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            stdev: stdev(statistic, samples)?,
        })
    }
}

/// Count of samples in one histogram bucket.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Bucket {
    pub label: &'static str,
    pub count: usize,
    pub share: Option<f64>,
}

/// Buckets `samples` by half-open `[lower, upper)` ranges; `None` bounds are open-ended.
pub fn bucketize(samples: &[f64], ranges: &[(&'static str, Option<f64>, Option<f64>)]) -> Vec<Bucket> {
    ranges
        .iter()
        .map(|&(label, lower, upper)| {
            let count = samples
                .iter()
                .filter(|&&x| lower.is_none_or(|lo| x >= lo) && upper.is_none_or(|hi| x < hi))
                .count();
            Bucket {
                label,
                count,
                share: share(count, samples.len()),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_matches_known_values() {
        let summary = Summary::from_samples("test", &[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]).unwrap();
        assert_eq!(summary.count, 8);
        assert_eq!(summary.mean, 5.0);
        assert_eq!(summary.median, 4.5);
        assert_eq!(summary.min, 2.0);
        assert_eq!(summary.max, 9.0);
        assert!((summary.stdev - (32.0f64 / 7.0).sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_odd_median() {
        assert_eq!(median("test", &[3.0, 1.0, 2.0]).unwrap(), 2.0);
    }

    #[test]
    fn test_stdev_needs_two_samples() {
        assert_eq!(
            stdev("base fee stdev", &[1.0]),
            Err(AnalysisError::InsufficientData {
                statistic: "base fee stdev",
                required: 2,
                actual: 1,
            })
        );
        assert!(Summary::from_samples("empty", &[]).is_err());
    }

    #[test]
    fn test_mean_of_nothing_is_an_error() {
        assert!(mean("empty", &[]).is_err());
    }

    #[test]
    fn test_share_and_percent_change() {
        assert_eq!(share(1, 4), Some(25.0));
        assert_eq!(share(0, 0), None);
        assert_eq!(percent_change(100.0, 112.5), Some(12.5));
        assert_eq!(percent_change(0.0, 5.0), None);
    }

    #[test]
    fn test_bucketize_half_open_ranges() {
        let buckets = bucketize(
            &[10.0, 25.0, 49.9, 50.0, 95.0],
            &[("low", None, Some(25.0)), ("mid", Some(25.0), Some(50.0)), ("high", Some(50.0), None)],
        );
        let counts: Vec<usize> = buckets.iter().map(|b| b.count).collect();
        assert_eq!(counts, vec![1, 2, 2]);
        assert_eq!(buckets[0].share, Some(20.0));
    }
}
