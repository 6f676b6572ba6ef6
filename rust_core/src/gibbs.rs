use crate::ising::RbmParams;
use ndarray::Array1;
use rand::Rng;
use rand_chacha::ChaCha8Rng;

/// Configuration for a single block Gibbs chain.
#[derive(Debug, Clone)]
pub struct GibbsConfig {
    /// Recorded sweeps after burn-in.
    pub num_sweeps: usize,
    pub num_burnin: usize,
}

impl Default for GibbsConfig {
    fn default() -> Self {
        Self {
            num_sweeps: 10_000,
            num_burnin: 1_000,
        }
    }
}

/// Result of a single Gibbs chain run.
#[derive(Debug, Clone)]
pub struct ChainResult {
    /// RBM energy after every recorded sweep.
    pub energies: Vec<f64>,
    pub visible: Array1<f64>,
    pub hidden: Array1<f64>,
}

/// Draw ±1 spins with P(+1) = (1 + tanh(a)) / 2 for every activation.
fn sample_spins(activation: Array1<f64>, rng: &mut ChaCha8Rng) -> Array1<f64> {
    activation.mapv_into(|a| {
        let u: f64 = rng.gen_range(-1.0..1.0);
        if a.tanh() > u {
            1.0
        } else {
            -1.0
        }
    })
}

/// One sweep: all hidden spins given the visible layer, then all visible
/// spins given the new hidden layer.
pub fn sweep(
    rbm: &RbmParams,
    visible: &Array1<f64>,
    rng: &mut ChaCha8Rng,
) -> (Array1<f64>, Array1<f64>) {
    let hidden = sample_spins(visible.dot(rbm.weights()) + rbm.bias(), rng);
    let visible = sample_spins(rbm.weights().dot(&hidden), rng);
    (visible, hidden)
}

/// Run a single block Gibbs chain from `init` (random spins if `None`).
///
/// The RBM is taken by shared reference and never mutated, so chains can
/// run side by side on one set of weights.
pub fn run_chain(
    rbm: &RbmParams,
    config: &GibbsConfig,
    rng: &mut ChaCha8Rng,
    init: Option<Array1<f64>>,
) -> ChainResult {
    let mut visible = init.unwrap_or_else(|| {
        Array1::from_shape_simple_fn(rbm.num_visible(), || {
            if rng.gen::<bool>() {
                1.0
            } else {
                -1.0
            }
        })
    });
    let mut hidden = Array1::zeros(rbm.num_hidden());

    for _ in 0..config.num_burnin {
        let (v, h) = sweep(rbm, &visible, rng);
        visible = v;
        hidden = h;
    }

    let mut energies = Vec::with_capacity(config.num_sweeps);
    for _ in 0..config.num_sweeps {
        let (v, h) = sweep(rbm, &visible, rng);
        visible = v;
        hidden = h;
        energies.push(rbm.energy(visible.view(), hidden.view()));
    }

    ChainResult {
        energies,
        visible,
        hidden,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{array, Array2};
    use rand::SeedableRng;

    #[test]
    fn test_spins_are_plus_minus_one() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let rbm = RbmParams::random(6, 2, &mut rng);
        let result = run_chain(
            &rbm,
            &GibbsConfig {
                num_sweeps: 20,
                num_burnin: 5,
            },
            &mut rng,
            None,
        );
        assert_eq!(result.energies.len(), 20);
        assert_eq!(result.visible.len(), 6);
        assert_eq!(result.hidden.len(), 12);
        assert!(result
            .visible
            .iter()
            .chain(result.hidden.iter())
            .all(|&s| s == 1.0 || s == -1.0));
    }

    #[test]
    fn test_strong_field_aligns_hidden_spins() {
        // tanh(±50) rounds to ±1, so the hidden layer follows the sign of its bias
        let rbm = RbmParams::new(Array2::zeros((2, 3)), array![50.0, -50.0, 50.0]).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let (_, hidden) = sweep(&rbm, &array![1.0, -1.0], &mut rng);
        assert_eq!(hidden, array![1.0, -1.0, 1.0]);
    }

    #[test]
    fn test_energy_matches_final_state() {
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        let rbm = RbmParams::random(4, 1, &mut rng);
        let result = run_chain(&rbm, &GibbsConfig::default(), &mut rng, Some(array![1.0, 1.0, -1.0, -1.0]));
        let last = *result.energies.last().unwrap();
        assert_eq!(last, rbm.energy(result.visible.view(), result.hidden.view()));
    }
}
