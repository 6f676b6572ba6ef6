//! Integrated autocorrelation time of a scalar Markov chain observable.
//!
//! The autocovariance uses the biased estimator (divisor n at every lag) and
//! the integrated time is truncated with the self-consistent window of
//! Sokal / Madras: the first M with M >= 4 τ(M) + 1, see also
//! Joseph et al. (2020), doi:10.1007/978-3-030-46044-0.

use crate::error::{Error, Result};
use rayon::prelude::*;

/// Integrated autocorrelation time and the window it was read off at.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IntegratedAutocorrelation {
    pub tau_int: f64,
    pub cutoff: usize,
}

impl IntegratedAutocorrelation {
    /// Number of effectively independent samples in a chain of `n` draws.
    ///
    /// `tau_int` is floored at 0.5 here, so anti-correlated chains report at
    /// most `n` rather than a negative count.
    pub fn effective_sample_size(&self, n: usize) -> f64 {
        n as f64 / (2.0 * self.tau_int.max(0.5))
    }
}

/// Biased sample autocovariance at every lag `0..n`.
///
/// Returns `(lags, autocovariance)`. Lags are evaluated in parallel, each
/// one summed sequentially, so the result does not depend on the thread pool.
pub fn sample_autocovariance(chain: &[f64]) -> Result<(Vec<usize>, Vec<f64>)> {
    let n = chain.len();
    if n == 0 {
        return Err(Error::EmptyChain);
    }
    let mean = chain.iter().sum::<f64>() / n as f64;
    let shifted: Vec<f64> = chain.iter().map(|&x| x - mean).collect();

    let autocov: Vec<f64> = (0..n)
        .into_par_iter()
        .map(|t| {
            let gamma: f64 = shifted[..n - t]
                .iter()
                .zip(&shifted[t..])
                .map(|(a, b)| a * b)
                .sum();
            gamma / n as f64
        })
        .collect();

    Ok(((0..n).collect(), autocov))
}

/// Divide by the lag-0 value so the sequence starts at exactly 1.
pub fn normalize_autocovariance(autocov: &[f64]) -> Result<Vec<f64>> {
    let c0 = *autocov.first().ok_or(Error::EmptyChain)?;
    if c0 == 0.0 || !c0.is_finite() {
        return Err(Error::DegenerateChain);
    }
    Ok(autocov.iter().map(|&c| c / c0).collect())
}

/// Integrated autocorrelation time of a normalized autocovariance sequence.
///
/// τ(M) = 0.5 + Σ_{t=1}^{M} ρ(t) is scanned for M = 1, 2, ... and the first
/// M satisfying M >= 4 τ(M) + 1 is returned together with τ(M).
pub fn integrated_autocorrelation_time(autocov: &[f64]) -> Result<IntegratedAutocorrelation> {
    let c0 = *autocov.first().ok_or(Error::EmptyChain)?;
    if c0 != 1.0 {
        return Err(Error::NotNormalized { value: c0 });
    }

    let mut cumsum = 0.0f64;
    for (m, &rho) in autocov.iter().enumerate().skip(1) {
        cumsum += rho;
        let tau = 0.5 + cumsum;
        if m as f64 >= 4.0 * tau + 1.0 {
            return Ok(IntegratedAutocorrelation {
                tau_int: tau,
                cutoff: m,
            });
        }
    }

    Err(Error::NonConvergentWindow {
        len: autocov.len(),
    })
}

/// Autocovariance, normalization and windowed integration in one call.
pub fn estimate(chain: &[f64]) -> Result<IntegratedAutocorrelation> {
    let (_, autocov) = sample_autocovariance(chain)?;
    let normalized = normalize_autocovariance(&autocov)?;
    integrated_autocorrelation_time(&normalized)
}

/// Per-chain summary of an observable trace.
#[derive(Debug, Clone)]
pub struct ChainAutocorrelation {
    pub name: String,
    pub num_samples: usize,
    pub mean: f64,
    pub std: f64,
    /// `None` when no self-consistent window exists (or the chain is constant).
    pub estimate: Option<IntegratedAutocorrelation>,
}

/// Autocorrelation summary for a set of chains.
#[derive(Debug, Clone)]
pub struct AutocorrelationReport {
    pub chains: Vec<ChainAutocorrelation>,
}

impl AutocorrelationReport {
    /// Summarize every chain. Chains without a name in `names` are called
    /// `chain_{index}`.
    pub fn compute(chains: &[Vec<f64>], names: &[String]) -> Self {
        let chains = chains
            .iter()
            .enumerate()
            .map(|(i, chain)| {
                let name = names
                    .get(i)
                    .cloned()
                    .unwrap_or_else(|| format!("chain_{}", i));
                let n = chain.len();
                let mean = if n > 0 {
                    chain.iter().sum::<f64>() / n as f64
                } else {
                    f64::NAN
                };
                let std = if n > 1 {
                    (chain.iter().map(|&x| (x - mean).powi(2)).sum::<f64>() / (n - 1) as f64)
                        .sqrt()
                } else {
                    f64::NAN
                };
                ChainAutocorrelation {
                    name,
                    num_samples: n,
                    mean,
                    std,
                    estimate: estimate(chain).ok(),
                }
            })
            .collect();
        Self { chains }
    }

    /// Render the report as a formatted table string.
    pub fn to_table(&self) -> String {
        let mut lines = Vec::new();
        lines.push(format!(
            "{:<12} {:>8} {:>12} {:>10} {:>10} {:>8} {:>10}",
            "Chain", "draws", "mean", "std", "tau_int", "cutoff", "ess"
        ));
        lines.push("─".repeat(76));

        for c in &self.chains {
            let (tau_s, cutoff_s, ess_s) = match c.estimate {
                Some(est) => (
                    format!("{:.4}", est.tau_int),
                    format!("{}", est.cutoff),
                    format!("{:.0}", est.effective_sample_size(c.num_samples)),
                ),
                None => ("NaN".to_string(), "-".to_string(), "NaN".to_string()),
            };
            lines.push(format!(
                "{:<12} {:>8} {:>12.4} {:>10.4} {:>10} {:>8} {:>10}",
                c.name, c.num_samples, c.mean, c.std, tau_s, cutoff_s, ess_s
            ));
        }

        lines.push("─".repeat(76));

        if self.chains.iter().any(|c| c.estimate.is_none()) {
            lines.push(
                "⚠  Some chains have no self-consistent window; run longer chains.".to_string(),
            );
        }

        lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use rand_distr::{Distribution, StandardNormal};

    #[test]
    fn test_autocovariance_divides_by_n() {
        let (lags, acov) = sample_autocovariance(&[1.0, 2.0, 3.0, 4.0]).unwrap();
        assert_eq!(lags, vec![0, 1, 2, 3]);
        assert_eq!(acov, vec![1.25, 0.3125, -0.375, -0.5625]);
    }

    #[test]
    fn test_empty_chain() {
        assert!(matches!(sample_autocovariance(&[]), Err(Error::EmptyChain)));
        assert!(matches!(
            integrated_autocorrelation_time(&[]),
            Err(Error::EmptyChain)
        ));
    }

    #[test]
    fn test_constant_chain_is_degenerate() {
        let (_, acov) = sample_autocovariance(&[3.5; 16]).unwrap();
        assert!(acov.iter().all(|&c| c == 0.0));
        assert!(matches!(
            normalize_autocovariance(&acov),
            Err(Error::DegenerateChain)
        ));
    }

    #[test]
    fn test_requires_normalized_input() {
        let err = integrated_autocorrelation_time(&[2.0, 1.0, 0.5]).unwrap_err();
        assert!(matches!(err, Error::NotNormalized { value } if value == 2.0));
    }

    #[test]
    fn test_first_satisfying_window_wins() {
        let mut acov = vec![1.0, 0.5, 0.25, 0.125];
        acov.resize(12, 0.0);
        let est = integrated_autocorrelation_time(&acov).unwrap();
        // τ = 1.375 from M = 3 on; 7 is the first M >= 4 * 1.375 + 1
        assert_eq!(est.cutoff, 7);
        assert_eq!(est.tau_int, 1.375);
    }

    #[test]
    fn test_geometric_decay() {
        let acov: Vec<f64> = (0..200).map(|t| 0.5f64.powi(t)).collect();
        let est = integrated_autocorrelation_time(&acov).unwrap();
        assert_eq!(est.cutoff, 7);
        assert!((est.tau_int - 1.4921875).abs() < 1e-12);
        assert!(est.tau_int >= 0.5);
    }

    #[test]
    fn test_window_not_found() {
        let err = integrated_autocorrelation_time(&[1.0, 0.9, 0.9, 0.9]).unwrap_err();
        assert!(matches!(err, Error::NonConvergentWindow { len: 4 }));
        assert!(matches!(
            integrated_autocorrelation_time(&[1.0]),
            Err(Error::NonConvergentWindow { len: 1 })
        ));
    }

    #[test]
    fn test_alternating_chain_cuts_off_immediately() {
        let chain: Vec<f64> = (0..8).map(|i| if i % 2 == 0 { 1.0 } else { -1.0 }).collect();
        let est = estimate(&chain).unwrap();
        assert_eq!(est.cutoff, 1);
        assert!(est.cutoff < chain.len() / 4);
        assert_eq!(est.tau_int, -0.375);
    }

    #[test]
    fn test_anti_correlated_ess_capped_at_chain_length() {
        let chain: Vec<f64> = (0..64).map(|i| if i % 2 == 0 { 1.0 } else { -1.0 }).collect();
        let est = estimate(&chain).unwrap();
        assert!(est.tau_int < 0.0);
        let ess = est.effective_sample_size(chain.len());
        assert!(ess > 0.0 && ess <= chain.len() as f64, "ess = {}", ess);
        assert_eq!(ess, 64.0);

        let report = AutocorrelationReport::compute(&[chain], &["alt".to_string()]);
        assert!(!report.to_table().contains(" -6"));
    }

    #[test]
    fn test_report_names_unnamed_chains() {
        let chain: Vec<f64> = (0..32).map(|i| (i % 3) as f64).collect();
        let report = AutocorrelationReport::compute(
            &[chain.clone(), chain.clone(), chain],
            &["first".to_string()],
        );
        let names: Vec<&str> = report.chains.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["first", "chain_1", "chain_2"]);
    }

    #[test]
    fn test_ar1_matches_theory() {
        // x_t = φ x_{t-1} + ε_t has τ_int = (1 + φ) / (2 (1 - φ)) = 4.5 for φ = 0.8
        let phi = 0.8;
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let mut x = 0.0f64;
        let chain: Vec<f64> = (0..10_000)
            .map(|_| {
                let eps: f64 = StandardNormal.sample(&mut rng);
                x = phi * x + eps;
                x
            })
            .collect();
        let est = estimate(&chain).unwrap();
        assert!(
            est.tau_int > 3.0 && est.tau_int < 6.0,
            "tau_int should be near 4.5, got {}",
            est.tau_int
        );
        assert!(est.cutoff as f64 >= 4.0 * est.tau_int + 1.0);
        assert!(est.effective_sample_size(chain.len()) < chain.len() as f64);
    }

    #[test]
    fn test_report_marks_failed_chains() {
        let good: Vec<f64> = (0..64).map(|i| if i % 2 == 0 { 1.0 } else { -1.0 }).collect();
        let flat = vec![1.0; 64];
        let report = AutocorrelationReport::compute(
            &[good, flat],
            &["chain_0".to_string(), "chain_1".to_string()],
        );
        assert!(report.chains[0].estimate.is_some());
        assert!(report.chains[1].estimate.is_none());
        let table = report.to_table();
        assert!(table.contains("chain_0"));
        assert!(table.contains("run longer chains"));
    }
}
