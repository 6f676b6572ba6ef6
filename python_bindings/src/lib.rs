use ndarray::Array2;
use numpy::{IntoPyArray, PyArray1, PyReadonlyArray1, PyReadonlyArray2};
use pyo3::exceptions::{
    PyAssertionError, PyFileNotFoundError, PyIOError, PyIndexError, PyRuntimeError, PyValueError,
};
use pyo3::prelude::*;
use pyo3::types::{PyDict, PyList};
use rbmising_core::autocorrelation;
use rbmising_core::ising::{self, RbmParams};
use rbmising_core::promotion::{ModelKey, PromotionOutcome, WeightPromoter, DEFAULT_MODEL_ROOT};
use rbmising_core::sampler::{self, SampleResult, SamplerConfig};
use rbmising_core::Error;

fn to_py_err(err: Error) -> PyErr {
    let msg = err.to_string();
    match err {
        Error::MissingInput { .. } => PyFileNotFoundError::new_err(msg),
        Error::Io { .. } | Error::Csv(_) => PyIOError::new_err(msg),
        Error::NotNormalized { .. } => PyAssertionError::new_err(msg),
        Error::EmptyChain | Error::NonConvergentWindow { .. } => PyIndexError::new_err(msg),
        Error::Render(_) => PyRuntimeError::new_err(msg),
        Error::Parse { .. }
        | Error::DimensionMismatch { .. }
        | Error::SpinCountMismatch { .. }
        | Error::DegenerateChain
        | Error::InvalidConfig(_) => PyValueError::new_err(msg),
    }
}

/// Convert the weights of one trained model on disk. Returns `False` when
/// the converted files were already present.
#[pyfunction]
#[pyo3(signature = (nspins, alpha, directory, root=DEFAULT_MODEL_ROOT.to_string()))]
fn promote_weights(
    py: Python<'_>,
    nspins: usize,
    alpha: usize,
    directory: String,
    root: String,
) -> PyResult<bool> {
    let key = ModelKey::new(nspins, alpha, directory);
    let outcome = py
        .allow_threads(|| WeightPromoter::new(root).promote_weights(&key))
        .map_err(to_py_err)?;
    Ok(matches!(outcome, PromotionOutcome::Converted { .. }))
}

/// In-memory conversion of RBM weights (N x M) and hidden biases (M).
///
/// Returns a dict with the full-sum `W`, `b` and the half-sum `J`, `h`.
#[pyfunction]
fn promote<'py>(
    py: Python<'py>,
    weights: PyReadonlyArray2<'py, f64>,
    bias: PyReadonlyArray1<'py, f64>,
    nspins: usize,
) -> PyResult<Bound<'py, PyDict>> {
    let rbm = RbmParams::new(weights.as_array().to_owned(), bias.as_array().to_owned())
        .map_err(to_py_err)?;
    let couplings = ising::promote(&rbm, nspins).map_err(to_py_err)?;

    let dict = PyDict::new(py);
    dict.set_item("W", couplings.w_full.into_pyarray(py))?;
    dict.set_item("b", couplings.b_full.into_pyarray(py))?;
    dict.set_item("J", couplings.j_half.into_pyarray(py))?;
    dict.set_item("h", couplings.h_half.into_pyarray(py))?;
    Ok(dict)
}

/// Biased autocovariance of a chain at every lag, returned as `(lags, acov)`.
#[pyfunction]
fn sample_autocovariance<'py>(
    py: Python<'py>,
    chain: PyReadonlyArray1<'py, f64>,
) -> PyResult<(Bound<'py, PyArray1<i64>>, Bound<'py, PyArray1<f64>>)> {
    let chain = chain.as_array().to_vec();
    let (lags, acov) = py
        .allow_threads(|| autocorrelation::sample_autocovariance(&chain))
        .map_err(to_py_err)?;
    let lags: Vec<i64> = lags.iter().map(|&l| l as i64).collect();
    Ok((PyArray1::from_vec(py, lags), PyArray1::from_vec(py, acov)))
}

/// Integrated autocorrelation time `(tau_int, cutoff)` of a normalized
/// autocovariance.
#[pyfunction]
fn calculate_autocorrelation_time_integrated(
    acov: PyReadonlyArray1<'_, f64>,
) -> PyResult<(f64, usize)> {
    let est = autocorrelation::integrated_autocorrelation_time(&acov.as_array().to_vec())
        .map_err(to_py_err)?;
    Ok((est.tau_int, est.cutoff))
}

/// Autocovariance, normalization and windowed integration in one call.
#[pyfunction]
fn autocorrelation_time(py: Python<'_>, chain: PyReadonlyArray1<'_, f64>) -> PyResult<(f64, usize)> {
    let chain = chain.as_array().to_vec();
    let est = py
        .allow_threads(|| autocorrelation::estimate(&chain))
        .map_err(to_py_err)?;
    Ok((est.tau_int, est.cutoff))
}

#[pyclass]
struct GibbsResult {
    result: SampleResult,
}

#[pymethods]
impl GibbsResult {
    /// Energies as a (chains, sweeps) array.
    fn get_energies<'py>(&self, py: Python<'py>) -> Bound<'py, numpy::PyArray2<f64>> {
        let n_chains = self.result.energies.len();
        let n_sweeps = self.result.energies.first().map_or(0, Vec::len);
        let arr = Array2::from_shape_fn((n_chains, n_sweeps), |(c, s)| self.result.energies[c][s]);
        arr.into_pyarray(py)
    }

    fn mean<'py>(&self, py: Python<'py>) -> PyResult<Bound<'py, PyList>> {
        PyList::new(py, self.result.mean())
    }

    /// Per-chain `(tau_int, cutoff)`, `None` where no window was found.
    fn autocorrelation<'py>(&self, py: Python<'py>) -> PyResult<Bound<'py, PyDict>> {
        let report = self.result.autocorrelation();
        let dict = PyDict::new(py);
        for chain in &report.chains {
            dict.set_item(&chain.name, chain.estimate.map(|e| (e.tau_int, e.cutoff)))?;
        }
        Ok(dict)
    }

    fn __repr__(&self) -> String {
        let n_chains = self.result.energies.len();
        let n_sweeps = self.result.energies.first().map_or(0, Vec::len);
        format!(
            "rbmising GibbsResult ({} chains × {} sweeps)\n{}",
            n_chains,
            n_sweeps,
            self.result.autocorrelation().to_table()
        )
    }
}

/// Block Gibbs chains on the RBM given by `weights` (N x M) and `bias` (M).
#[pyfunction]
#[pyo3(signature = (weights, bias, chains=4, sweeps=10_000, burnin=1_000, seed=42, threads=0))]
#[allow(clippy::too_many_arguments)]
fn sample_gibbs(
    py: Python<'_>,
    weights: PyReadonlyArray2<'_, f64>,
    bias: PyReadonlyArray1<'_, f64>,
    chains: usize,
    sweeps: usize,
    burnin: usize,
    seed: u64,
    threads: usize,
) -> PyResult<GibbsResult> {
    let rbm = RbmParams::new(weights.as_array().to_owned(), bias.as_array().to_owned())
        .map_err(to_py_err)?;
    let config = SamplerConfig {
        num_chains: chains,
        num_sweeps: sweeps,
        num_burnin: burnin,
        seed,
        num_threads: threads,
    };

    let result = py
        .allow_threads(|| sampler::sample(&rbm, &config))
        .map_err(to_py_err)?;

    Ok(GibbsResult { result })
}

#[pymodule]
fn rbmising(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<GibbsResult>()?;
    m.add_function(wrap_pyfunction!(promote_weights, m)?)?;
    m.add_function(wrap_pyfunction!(promote, m)?)?;
    m.add_function(wrap_pyfunction!(sample_autocovariance, m)?)?;
    m.add_function(wrap_pyfunction!(calculate_autocorrelation_time_integrated, m)?)?;
    m.add_function(wrap_pyfunction!(autocorrelation_time, m)?)?;
    m.add_function(wrap_pyfunction!(sample_gibbs, m)?)?;
    Ok(())
}
