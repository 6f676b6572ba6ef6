//! Promote many models in one run.
//!
//! A failing model is logged and recorded, then the batch moves on; the
//! caller gets one result per input key. Distinct directories never share
//! files, so keys may be processed in parallel. Two keys naming the same
//! directory and spin count in one parallel batch race on the same output
//! files.

use crate::error::{Error, Result};
use crate::progress::{spawn_progress_thread, ProgressState};
use crate::promotion::{ModelKey, PromotionOutcome, WeightPromoter};
use rayon::prelude::*;
use std::sync::Arc;
use tracing::{error, info};

#[derive(Debug, Clone, Default)]
pub struct BatchOptions {
    /// Process keys on the rayon pool instead of sequentially.
    pub parallel: bool,
    /// Draw a progress bar on stderr.
    pub progress: bool,
}

#[derive(Debug)]
pub struct ItemResult {
    pub key: ModelKey,
    pub outcome: Result<PromotionOutcome>,
}

#[derive(Debug, Default)]
pub struct BatchReport {
    pub items: Vec<ItemResult>,
}

impl BatchReport {
    pub fn converted(&self) -> usize {
        self.items
            .iter()
            .filter(|i| matches!(i.outcome, Ok(PromotionOutcome::Converted { .. })))
            .count()
    }

    pub fn skipped(&self) -> usize {
        self.items
            .iter()
            .filter(|i| matches!(i.outcome, Ok(PromotionOutcome::Skipped)))
            .count()
    }

    pub fn failed(&self) -> usize {
        self.items.iter().filter(|i| i.outcome.is_err()).count()
    }

    pub fn failures(&self) -> impl Iterator<Item = (&ModelKey, &Error)> {
        self.items
            .iter()
            .filter_map(|i| i.outcome.as_ref().err().map(|e| (&i.key, e)))
    }

    pub fn summary(&self) -> String {
        format!(
            "{} models: {} converted, {} skipped, {} failed",
            self.items.len(),
            self.converted(),
            self.skipped(),
            self.failed()
        )
    }
}

/// Promote every key, collecting per-key outcomes in input order.
pub fn promote_all(
    promoter: &WeightPromoter,
    keys: &[ModelKey],
    options: &BatchOptions,
) -> BatchReport {
    info!("Processing {} models under {}", keys.len(), promoter.root().display());

    let state = Arc::new(ProgressState::new("Promoting", keys.len()));
    let handle = if options.progress {
        Some(spawn_progress_thread(state.clone()))
    } else {
        None
    };

    let run_one = |key: &ModelKey| {
        let outcome = promoter.promote_weights(key);
        match &outcome {
            Ok(PromotionOutcome::Skipped) => state.add_skipped(),
            Ok(PromotionOutcome::Converted { .. }) => {}
            Err(e) => {
                error!("Error processing {}: {}", key, e);
                state.add_failure();
            }
        }
        state.increment();
        ItemResult {
            key: key.clone(),
            outcome,
        }
    };

    let items: Vec<ItemResult> = if options.parallel {
        keys.par_iter().map(run_one).collect()
    } else {
        keys.iter().map(run_one).collect()
    };

    state.finish();
    if let Some(handle) = handle {
        let _ = handle.join();
    }

    let report = BatchReport { items };
    info!("Processing complete: {}", report.summary());
    report
}
