//! RBM parameters and their Ising spin-glass representation.
//!
//! An RBM with visible spins v (N) and hidden spins h (M) has energy
//!   E(v, h) = -(vᵀ W h + b · h)
//! Stacking s = [h; v] (hidden first) turns the bipartite weight matrix into
//! a symmetric coupling matrix over M + N spins. Two summation conventions
//! are produced:
//!   full sum  E(s) = -(Σ_i Σ_j W_ij s_i s_j + Σ_i b_i s_i),  W_ij = W/2 blocks
//!   half sum  E(s) = -(Σ_{i<j} J_ij s_i s_j + Σ_i h_i s_i),  J = 2 W

use crate::error::{Error, Result};
use ndarray::{s, Array1, Array2, ArrayView1};
use rand::Rng;
use rand_distr::Uniform;

/// Trained RBM weights (visible x hidden) and hidden biases.
#[derive(Debug, Clone, PartialEq)]
pub struct RbmParams {
    weights: Array2<f64>,
    bias: Array1<f64>,
}

impl RbmParams {
    pub fn new(weights: Array2<f64>, bias: Array1<f64>) -> Result<Self> {
        if bias.len() != weights.ncols() {
            return Err(Error::DimensionMismatch {
                what: "hidden bias",
                expected: weights.ncols(),
                actual: bias.len(),
            });
        }
        Ok(Self { weights, bias })
    }

    /// Random RBM with weights and biases uniform in [-0.5, 0.5).
    pub fn random<R: Rng>(nspins: usize, alpha: usize, rng: &mut R) -> Self {
        let num_hidden = nspins * alpha;
        let dist = Uniform::new(-0.5, 0.5);
        let weights = Array2::from_shape_simple_fn((nspins, num_hidden), || rng.sample(&dist));
        let bias = Array1::from_shape_simple_fn(num_hidden, || rng.sample(&dist));
        Self { weights, bias }
    }

    pub fn weights(&self) -> &Array2<f64> {
        &self.weights
    }

    pub fn bias(&self) -> &Array1<f64> {
        &self.bias
    }

    pub fn num_visible(&self) -> usize {
        self.weights.nrows()
    }

    pub fn num_hidden(&self) -> usize {
        self.weights.ncols()
    }

    pub fn energy(&self, visible: ArrayView1<f64>, hidden: ArrayView1<f64>) -> f64 {
        -(visible.dot(&self.weights.dot(&hidden)) + self.bias.dot(&hidden))
    }
}

/// Ising couplings and fields over the combined hidden + visible index space.
#[derive(Debug, Clone, PartialEq)]
pub struct IsingCouplings {
    pub num_hidden: usize,
    pub num_visible: usize,
    /// Couplings for the full double sum over ordered pairs.
    pub w_full: Array2<f64>,
    pub b_full: Array1<f64>,
    /// Couplings for the half sum over unordered pairs.
    pub j_half: Array2<f64>,
    pub h_half: Array1<f64>,
}

impl IsingCouplings {
    pub fn num_spins(&self) -> usize {
        self.num_hidden + self.num_visible
    }

    pub fn energy_full_sum(&self, spins: ArrayView1<f64>) -> f64 {
        -(spins.dot(&self.w_full.dot(&spins)) + self.b_full.dot(&spins))
    }

    pub fn energy_half_sum(&self, spins: ArrayView1<f64>) -> f64 {
        let n = self.num_spins();
        let mut pair = 0.0;
        for i in 0..n {
            for j in (i + 1)..n {
                pair += self.j_half[[i, j]] * spins[i] * spins[j];
            }
        }
        -(pair + self.h_half.dot(&spins))
    }

    /// Stack hidden and visible configurations into one spin vector.
    pub fn stack(hidden: ArrayView1<f64>, visible: ArrayView1<f64>) -> Array1<f64> {
        let mut spins = Array1::zeros(hidden.len() + visible.len());
        spins.slice_mut(s![..hidden.len()]).assign(&hidden);
        spins.slice_mut(s![hidden.len()..]).assign(&visible);
        spins
    }
}

/// Convert RBM parameters into both Ising coupling layouts.
///
/// `nspins` is the caller's spin count (used for artifact naming); it must
/// equal the number of visible units in `rbm`.
pub fn promote(rbm: &RbmParams, nspins: usize) -> Result<IsingCouplings> {
    let n = rbm.num_visible();
    let m = rbm.num_hidden();
    if nspins != n {
        return Err(Error::SpinCountMismatch {
            nspins,
            visible: n,
        });
    }

    let w = rbm.weights();
    let mut j_half = Array2::<f64>::zeros((m + n, m + n));
    j_half.slice_mut(s![..m, m..]).assign(&w.t());
    j_half.slice_mut(s![m.., ..m]).assign(w);

    let mut w_full = Array2::<f64>::zeros((m + n, m + n));
    w_full.slice_mut(s![..m, m..]).assign(&(&w.t() / 2.0));
    w_full.slice_mut(s![m.., ..m]).assign(&(w / 2.0));

    let h_half = pad_with_zeros(rbm.bias(), n);
    let b_full = pad_with_zeros(rbm.bias(), nspins);

    Ok(IsingCouplings {
        num_hidden: m,
        num_visible: n,
        w_full,
        b_full,
        j_half,
        h_half,
    })
}

fn pad_with_zeros(bias: &Array1<f64>, zeros: usize) -> Array1<f64> {
    let mut padded = Array1::zeros(bias.len() + zeros);
    padded.slice_mut(s![..bias.len()]).assign(bias);
    padded
}
