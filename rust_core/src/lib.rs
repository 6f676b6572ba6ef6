pub mod autocorrelation;
pub mod batch;
pub mod error;
pub mod gibbs;
pub mod ising;
pub mod models;
pub mod progress;
pub mod promotion;
pub mod render;
pub mod sampler;
pub mod table;

pub use error::{Error, Result};
pub use promotion::{ModelKey, PromotionOutcome, WeightPromoter};

