//! Weight promotion: load trained RBM weights for one model, convert them
//! to Ising couplings and persist both summation layouts.
//!
//! Outputs are cached by presence. If all four coupling files already exist
//! the model is skipped without reading or validating anything. Each file
//! is written to a temporary sibling and renamed into place, so a present
//! file is always a complete one.

use crate::error::Result;
use crate::ising::{self, RbmParams};
use crate::render::ReportRenderer;
use crate::table;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Default location of the per-model directories.
pub const DEFAULT_MODEL_ROOT: &str = "data/models";

/// Identifies one trained model: spin count, hidden-unit ratio and the
/// directory holding its weights.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ModelKey {
    pub nspins: usize,
    pub alpha: usize,
    pub directory: String,
}

impl ModelKey {
    pub fn new(nspins: usize, alpha: usize, directory: impl Into<String>) -> Self {
        Self {
            nspins,
            alpha,
            directory: directory.into(),
        }
    }
}

impl fmt::Display for ModelKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, {}, {}", self.nspins, self.alpha, self.directory)
    }
}

/// File locations for one model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    pub rbm_weights: PathBuf,
    pub rbm_bias: PathBuf,
    /// Full-sum couplings, `W_ising_*_W.csv`.
    pub ising_w: PathBuf,
    pub ising_b: PathBuf,
    /// Half-sum couplings, `Ising_*_J.csv`.
    pub ising_j: PathBuf,
    pub ising_h: PathBuf,
    pub figure: PathBuf,
}

impl ArtifactPaths {
    pub fn new(root: &Path, key: &ModelKey) -> Self {
        let dir = root.join(&key.directory);
        let tag = format!("{}_{}_ti", key.nspins, key.alpha);
        Self {
            rbm_weights: dir.join(format!("W_RBM_{}_W.csv", tag)),
            rbm_bias: dir.join(format!("W_RBM_{}_b.csv", tag)),
            ising_w: dir.join(format!("W_ising_{}_W.csv", tag)),
            ising_b: dir.join(format!("W_ising_{}_b.csv", tag)),
            ising_j: dir.join(format!("Ising_{}_J.csv", tag)),
            ising_h: dir.join(format!("Ising_{}_h.csv", tag)),
            figure: dir.join("figures").join(format!("W_RBM_{}_W.svg", tag)),
        }
    }

    pub fn outputs(&self) -> [&Path; 4] {
        [&self.ising_w, &self.ising_b, &self.ising_j, &self.ising_h]
    }

    pub fn outputs_exist(&self) -> bool {
        self.outputs().iter().all(|p| p.exists())
    }
}

/// Load the trained RBM weights (N x M) and hidden biases (M) of one model.
pub fn load_rbm(paths: &ArtifactPaths) -> Result<RbmParams> {
    let weights = table::read_matrix(&paths.rbm_weights)?;
    let bias = table::read_vector(&paths.rbm_bias)?;
    RbmParams::new(weights, bias)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromotionOutcome {
    /// All outputs were already present.
    Skipped,
    Converted { num_hidden: usize, num_visible: usize },
}

/// Converts RBM weight files under `root` into Ising coupling files.
pub struct WeightPromoter {
    root: PathBuf,
    renderer: Option<Box<dyn ReportRenderer>>,
}

impl WeightPromoter {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            renderer: None,
        }
    }

    /// Render a report for every converted model.
    pub fn with_renderer(mut self, renderer: impl ReportRenderer + 'static) -> Self {
        self.renderer = Some(Box::new(renderer));
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn paths(&self, key: &ModelKey) -> ArtifactPaths {
        ArtifactPaths::new(&self.root, key)
    }

    pub fn promote_weights(&self, key: &ModelKey) -> Result<PromotionOutcome> {
        let paths = self.paths(key);
        if paths.outputs_exist() {
            info!("Ignore file {}: converted weights exist", key);
            return Ok(PromotionOutcome::Skipped);
        }

        let rbm = load_rbm(&paths)?;

        let m = rbm.num_hidden();
        let n = rbm.num_visible();
        info!(
            "Note that M = {}, N = {} and alpha = {} where M = N x alpha = {} x {} and bias size = M = {}",
            m,
            n,
            key.alpha,
            key.nspins,
            key.alpha,
            rbm.bias().len()
        );
        if m != n * key.alpha {
            warn!(
                "{}: hidden units M = {} differ from N x alpha = {}",
                key,
                m,
                n * key.alpha
            );
        }

        let couplings = ising::promote(&rbm, key.nspins)?;

        if let Some(renderer) = &self.renderer {
            if let Some(dir) = paths.figure.parent() {
                fs::create_dir_all(dir).map_err(|e| crate::error::Error::Io {
                    path: dir.to_path_buf(),
                    source: e,
                })?;
            }
            renderer.render(&couplings, key, &paths.figure)?;
        }

        debug!(
            "shape of W_new = {:?}, shape of b_new = {:?}",
            couplings.w_full.dim(),
            couplings.b_full.dim()
        );

        // full summation over i, j = 1..N
        table::write_matrix(&paths.ising_w, &couplings.w_full)?;
        table::write_vector(&paths.ising_b, &couplings.b_full)?;
        // half summation over i < j
        table::write_matrix(&paths.ising_j, &couplings.j_half)?;
        table::write_vector(&paths.ising_h, &couplings.h_half)?;

        Ok(PromotionOutcome::Converted {
            num_hidden: m,
            num_visible: n,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::ising::IsingCouplings;
    use ndarray::{array, Array1, Array2};
    use std::sync::{Arc, Mutex};

    fn write_rbm(root: &Path, key: &ModelKey, w: &Array2<f64>, b: &Array1<f64>) {
        let paths = ArtifactPaths::new(root, key);
        fs::create_dir_all(paths.rbm_weights.parent().unwrap()).unwrap();
        table::write_matrix(&paths.rbm_weights, w).unwrap();
        table::write_vector(&paths.rbm_bias, b).unwrap();
    }

    #[test]
    fn test_paths() {
        let key = ModelKey::new(16, 2, "modified_RBM_low_model_id=0");
        let paths = ArtifactPaths::new(Path::new("data/models"), &key);
        assert_eq!(
            paths.rbm_weights,
            Path::new("data/models/modified_RBM_low_model_id=0/W_RBM_16_2_ti_W.csv")
        );
        assert!(paths.ising_j.ends_with("Ising_16_2_ti_J.csv"));
        assert!(paths.ising_h.ends_with("Ising_16_2_ti_h.csv"));
        assert!(paths.ising_b.ends_with("W_ising_16_2_ti_b.csv"));
        assert!(paths.figure.ends_with("figures/W_RBM_16_2_ti_W.svg"));
    }

    #[test]
    fn test_converts_and_writes_all_outputs() {
        let dir = tempfile::tempdir().unwrap();
        let key = ModelKey::new(2, 2, "m0");
        let w = array![[0.5, -1.0, 0.25, 2.0], [1.5, 0.75, -0.5, -2.0]];
        write_rbm(dir.path(), &key, &w, &array![0.1, -0.2, 0.3, -0.4]);

        let promoter = WeightPromoter::new(dir.path());
        let outcome = promoter.promote_weights(&key).unwrap();
        assert_eq!(
            outcome,
            PromotionOutcome::Converted {
                num_hidden: 4,
                num_visible: 2
            }
        );

        let paths = promoter.paths(&key);
        let w_full = table::read_matrix(&paths.ising_w).unwrap();
        let j_half = table::read_matrix(&paths.ising_j).unwrap();
        assert_eq!(j_half, &w_full * 2.0);
        assert_eq!(w_full[[4, 1]], -0.5);
        assert_eq!(table::read_vector(&paths.ising_h).unwrap().len(), 6);
        assert_eq!(
            table::read_vector(&paths.ising_b).unwrap(),
            table::read_vector(&paths.ising_h).unwrap()
        );
        // no renderer configured
        assert!(!paths.figure.exists());
    }

    #[test]
    fn test_missing_input() {
        let dir = tempfile::tempdir().unwrap();
        let promoter = WeightPromoter::new(dir.path());
        let err = promoter
            .promote_weights(&ModelKey::new(4, 1, "absent"))
            .unwrap_err();
        assert!(matches!(err, Error::MissingInput { .. }));
    }

    #[test]
    fn test_bias_shape_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        let key = ModelKey::new(2, 1, "bad");
        write_rbm(dir.path(), &key, &Array2::zeros((2, 2)), &Array1::zeros(3));
        let err = WeightPromoter::new(dir.path())
            .promote_weights(&key)
            .unwrap_err();
        assert!(matches!(err, Error::DimensionMismatch { .. }));
        assert!(!ArtifactPaths::new(dir.path(), &key).ising_w.exists());
    }

    #[test]
    fn test_alpha_mismatch_is_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        // 3 hidden units but the caller claims alpha = 2
        let key = ModelKey::new(2, 2, "odd");
        write_rbm(dir.path(), &key, &Array2::ones((2, 3)), &Array1::zeros(3));
        let outcome = WeightPromoter::new(dir.path()).promote_weights(&key).unwrap();
        assert_eq!(
            outcome,
            PromotionOutcome::Converted {
                num_hidden: 3,
                num_visible: 2
            }
        );
    }

    #[test]
    fn test_nspins_mismatch_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let key = ModelKey::new(4, 1, "wrong_n");
        write_rbm(dir.path(), &key, &Array2::ones((2, 2)), &Array1::zeros(2));
        let err = WeightPromoter::new(dir.path())
            .promote_weights(&key)
            .unwrap_err();
        assert!(matches!(err, Error::SpinCountMismatch { nspins: 4, visible: 2 }));
    }

    #[derive(Clone, Default)]
    struct RecordingRenderer {
        calls: Arc<Mutex<Vec<(PathBuf, usize)>>>,
    }

    impl ReportRenderer for RecordingRenderer {
        fn render(&self, couplings: &IsingCouplings, _key: &ModelKey, path: &Path) -> Result<()> {
            self.calls
                .lock()
                .unwrap()
                .push((path.to_path_buf(), couplings.num_spins()));
            Ok(())
        }
    }

    #[test]
    fn test_renderer_called_with_figure_path() {
        let dir = tempfile::tempdir().unwrap();
        let key = ModelKey::new(2, 1, "fig");
        write_rbm(dir.path(), &key, &Array2::ones((2, 2)), &Array1::zeros(2));

        let renderer = RecordingRenderer::default();
        let promoter = WeightPromoter::new(dir.path()).with_renderer(renderer.clone());
        promoter.promote_weights(&key).unwrap();

        let calls = renderer.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, promoter.paths(&key).figure);
        assert_eq!(calls[0].1, 4);
        assert!(calls[0].0.parent().unwrap().is_dir());
    }
}
