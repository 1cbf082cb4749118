//! Discrete power-law fitting for resource popularity
//!
//! Fits `p(x) ∝ x^-alpha` for `x >= xmin` to integer access counts. Every
//! distinct value (except the largest) is tried as `xmin`; alpha comes from the
//! discrete maximum-likelihood approximation and the candidate with the
//! smallest Kolmogorov-Smirnov distance wins.

use anyhow::{bail, ensure, Result};
use serde::Serialize;

/// Terms summed directly before the Euler-Maclaurin tail kicks in
const ZETA_DIRECT_TERMS: usize = 10;

/// B_2j / (2j)! for j = 1..=7
const ZETA_TAIL_COEFFS: [f64; 7] = [
    1.0 / 12.0,
    -1.0 / 720.0,
    1.0 / 30_240.0,
    -1.0 / 1_209_600.0,
    1.0 / 47_900_160.0,
    -691.0 / 1_307_674_368_000.0,
    1.0 / 74_724_249_600.0,
];

/// A fitted discrete power law.
#[derive(Debug, Clone, Serialize)]
pub struct PowerLawFit {
    /// Scaling exponent
    pub alpha: f64,
    /// Lower bound of the power-law tail
    pub xmin: f64,
    /// Kolmogorov-Smirnov distance of the tail to the fitted law
    pub ks_distance: f64,
    /// Number of observations in the tail
    pub tail_len: usize,
    /// Standard error of alpha
    pub sigma: f64,
}

/// Fit a discrete power law to positive counts.
pub fn fit_discrete(counts: &[u64]) -> Result<PowerLawFit> {
    ensure!(!counts.is_empty(), "no data to fit");
    ensure!(counts.iter().all(|&c| c > 0), "power-law data must be positive");

    let mut data: Vec<f64> = counts.iter().map(|&c| c as f64).collect();
    data.sort_by(f64::total_cmp);

    let mut candidates = data.clone();
    candidates.dedup();
    // The largest value can't be xmin: the tail needs at least two distinct points.
    candidates.pop();
    if candidates.is_empty() {
        bail!("need at least two distinct values to choose xmin");
    }

    let mut best: Option<PowerLawFit> = None;
    for xmin in candidates {
        let Some(fit) = fit_with_xmin(&data, xmin) else {
            continue;
        };
        if best.as_ref().map_or(true, |b| fit.ks_distance < b.ks_distance) {
            best = Some(fit);
        }
    }

    match best {
        Some(fit) => Ok(fit),
        None => bail!("no xmin candidate produced a valid power-law fit"),
    }
}

/// Fit the tail `x >= xmin` of sorted `data`. `None` if the fit is unusable.
fn fit_with_xmin(data: &[f64], xmin: f64) -> Option<PowerLawFit> {
    let start = data.partition_point(|&x| x < xmin);
    let tail = &data[start..];
    let n = tail.len();
    if n == 0 {
        return None;
    }

    let log_sum: f64 = tail.iter().map(|&x| (x / (xmin - 0.5)).ln()).sum();
    let alpha = 1.0 + n as f64 / log_sum;
    if !alpha.is_finite() || alpha <= 1.0 {
        return None;
    }

    let ks_distance = ks_distance(tail, xmin, alpha);
    if !ks_distance.is_finite() {
        return None;
    }

    Some(PowerLawFit {
        alpha,
        xmin,
        ks_distance,
        tail_len: n,
        sigma: (alpha - 1.0) / (n as f64).sqrt(),
    })
}

/// Largest gap between the tail's empirical `P(X < x)` and the fitted
/// discrete CDF, evaluated at the tail's distinct values. NaN if any gap is.
///
/// When the normalizer underflows the whole fitted mass sits at `xmin`, so
/// the fitted CDF is 1 everywhere.
fn ks_distance(sorted_tail: &[f64], xmin: f64, alpha: f64) -> f64 {
    let n = sorted_tail.len() as f64;
    let norm = hurwitz_zeta(alpha, xmin);
    let degenerate = !(norm.is_finite() && norm > 0.0);

    let mut distance: f64 = 0.0;
    let mut idx = 0;
    while idx < sorted_tail.len() {
        let x = sorted_tail[idx];
        let empirical = idx as f64 / n;
        let theoretical = if degenerate {
            1.0
        } else {
            1.0 - hurwitz_zeta(alpha, x) / norm
        };
        let gap = (theoretical - empirical).abs();
        if gap.is_nan() {
            return f64::NAN;
        }
        distance = distance.max(gap);

        while idx < sorted_tail.len() && sorted_tail[idx] == x {
            idx += 1;
        }
    }
    distance
}

/// Hurwitz zeta `ζ(s, q) = Σ_{k≥0} (q + k)^-s` for `s > 1`, `q > 0`.
///
/// Direct summation of the first terms, then Euler-Maclaurin for the tail.
pub fn hurwitz_zeta(s: f64, q: f64) -> f64 {
    if !(s > 1.0) || !(q > 0.0) {
        return f64::NAN;
    }

    let mut sum: f64 = (0..ZETA_DIRECT_TERMS)
        .map(|k| (q + k as f64).powf(-s))
        .sum();

    let a = q + ZETA_DIRECT_TERMS as f64;
    sum += a.powf(1.0 - s) / (s - 1.0) + 0.5 * a.powf(-s);

    let mut rising = s;
    let mut power = a.powf(-s - 1.0);
    for (j, coeff) in ZETA_TAIL_COEFFS.iter().enumerate() {
        sum += coeff * rising * power;
        let k = 2.0 * j as f64;
        rising *= (s + k + 1.0) * (s + k + 2.0);
        power /= a * a;
    }
    sum
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    #[test]
    fn test_hurwitz_zeta_known_values() {
        assert!((hurwitz_zeta(2.0, 1.0) - PI * PI / 6.0).abs() < 1e-12);
        assert!((hurwitz_zeta(2.0, 2.0) - (PI * PI / 6.0 - 1.0)).abs() < 1e-12);
        assert!((hurwitz_zeta(3.0, 1.0) - 1.202_056_903_159_594).abs() < 1e-12);
        assert!((hurwitz_zeta(1.05, 1.0) - 20.580_844_302).abs() < 1e-6);
        assert!(hurwitz_zeta(1.0, 1.0).is_nan());
    }

    #[test]
    fn test_fit_small_skewed_sample() {
        let fit = fit_discrete(&[50, 30, 10, 10]).unwrap();
        assert!(fit.alpha.is_finite());
        assert!(fit.alpha > 1.0);
        assert_eq!(fit.xmin, 10.0);
        assert_eq!(fit.tail_len, 4);
        assert!((fit.alpha - 2.373_05).abs() < 1e-4);
        assert!((fit.ks_distance - 0.288_696).abs() < 1e-4);
    }

    #[test]
    fn test_fit_picks_smallest_ks_distance() {
        let fit = fit_discrete(&[100, 40, 20, 10, 5, 5, 3, 2, 1, 1, 1, 1]).unwrap();
        assert_eq!(fit.xmin, 1.0);
        assert!((fit.alpha - 1.445_75).abs() < 1e-4);
    }

    #[test]
    fn test_underflowing_normalizer_does_not_win() {
        // zeta(alpha, 1000) underflows for the xmin = 1000 candidate
        let fit = fit_discrete(&[1, 2, 1000, 1001]).unwrap();
        assert!(fit.xmin < 1000.0);
        assert_eq!(fit.xmin, 1.0);
        assert!((fit.alpha - 1.231_451).abs() < 1e-4);
        assert!((fit.ks_distance - 0.322_267).abs() < 1e-4);
    }

    #[test]
    fn test_ks_distance_of_underflowed_fit_is_one() {
        let d = ks_distance(&[1000.0, 1001.0], 1000.0, 1001.1248);
        assert!((d - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_fit_needs_two_distinct_values() {
        assert!(fit_discrete(&[7]).is_err());
        assert!(fit_discrete(&[4, 4, 4]).is_err());
        assert!(fit_discrete(&[]).is_err());
        assert!(fit_discrete(&[0, 3]).is_err());
    }
}
