//! Experiment grid of trained RBM models.
//!
//! Every record is built by the factory functions below; nothing here is
//! global or mutable.

use crate::error::{Error, Result};
use crate::promotion::ModelKey;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fs::File;
use std::path::Path;

/// (alpha, smallest L, largest L), L stepping by 2.
type Grid = &'static [(usize, usize, usize)];

const LOW_MC_GRID: Grid = &[(1, 4, 10), (2, 4, 14), (3, 4, 14), (4, 4, 14), (8, 4, 10)];
const HIGH_MC_GRID: Grid = &[(2, 16, 22), (3, 16, 22), (4, 16, 22), (8, 12, 20)];

/// Training preset. The `2k` presets were trained with the low Monte Carlo
/// budget, the `10k` presets with the high one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Preset {
    #[serde(rename = "2k_nonsquare")]
    LowNonsquare,
    #[serde(rename = "10k_nonsquare")]
    HighNonsquare,
    #[serde(rename = "2k_standard")]
    LowStandard,
    #[serde(rename = "10k_standard")]
    HighStandard,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresetSettings {
    pub parallel: bool,
    pub iterations: usize,
    pub version: &'static str,
}

impl Preset {
    pub const ALL: [Preset; 4] = [
        Preset::LowNonsquare,
        Preset::HighNonsquare,
        Preset::LowStandard,
        Preset::HighStandard,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Preset::LowNonsquare => "2k_nonsquare",
            Preset::HighNonsquare => "10k_nonsquare",
            Preset::LowStandard => "2k_standard",
            Preset::HighStandard => "10k_standard",
        }
    }

    pub fn settings(self) -> PresetSettings {
        PresetSettings {
            parallel: true,
            iterations: 300,
            version: "v3",
        }
    }

    pub fn nonsquare(self) -> bool {
        matches!(self, Preset::LowNonsquare | Preset::HighNonsquare)
    }

    /// Independently trained copies per grid point.
    pub fn repeat(self) -> usize {
        if self.nonsquare() {
            5
        } else {
            1
        }
    }

    fn grid(self) -> Grid {
        match self {
            Preset::LowNonsquare | Preset::LowStandard => LOW_MC_GRID,
            Preset::HighNonsquare | Preset::HighStandard => HIGH_MC_GRID,
        }
    }

    /// Directory (under the model data root) holding the weights of one copy.
    pub fn directory(self, model_id: usize) -> String {
        let family = if self.nonsquare() { "modified" } else { "standard" };
        let budget = match self {
            Preset::LowNonsquare | Preset::LowStandard => "low",
            Preset::HighNonsquare | Preset::HighStandard => "high",
        };
        format!("{}_RBM_{}_model_id={}", family, budget, model_id)
    }
}

/// One trained model of the experiment grid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModelConfig {
    #[serde(rename = "L")]
    pub l: usize,
    pub alpha: usize,
    #[serde(serialize_with = "python_bool::serialize")]
    pub nonsquare: bool,
    pub model_id: usize,
    pub preset: Preset,
    #[serde(serialize_with = "python_bool::serialize")]
    pub parallel: bool,
    pub iterations: usize,
    pub directory: String,
    pub version: String,
    pub nspins: usize,
}

impl ModelConfig {
    pub fn key(&self) -> ModelKey {
        ModelKey::new(self.nspins, self.alpha, self.directory.clone())
    }
}

/// Expand a preset over its (alpha, L) grid and its repeated copies.
pub fn preset_models(preset: Preset) -> Vec<ModelConfig> {
    let settings = preset.settings();
    let mut models = Vec::new();
    for &(alpha, lo, hi) in preset.grid() {
        for l in (lo..=hi).step_by(2) {
            for model_id in 0..preset.repeat() {
                models.push(ModelConfig {
                    l,
                    alpha,
                    nonsquare: preset.nonsquare(),
                    model_id,
                    preset,
                    parallel: settings.parallel,
                    iterations: settings.iterations,
                    directory: preset.directory(model_id),
                    version: settings.version.to_string(),
                    nspins: l * l,
                });
            }
        }
    }
    models
}

/// Modified (non-square) RBMs, low then high Monte Carlo budget.
pub fn nonsquare_models() -> Vec<ModelConfig> {
    let mut models = preset_models(Preset::LowNonsquare);
    models.extend(preset_models(Preset::HighNonsquare));
    models
}

pub fn standard_models() -> Vec<ModelConfig> {
    let mut models = preset_models(Preset::LowStandard);
    models.extend(preset_models(Preset::HighStandard));
    models
}

/// Every model used for training-curve analysis.
pub fn train_models() -> Vec<ModelConfig> {
    let mut models = nonsquare_models();
    models.extend(standard_models());
    models
}

/// Models whose weights are converted and sampled.
pub fn final_models() -> Vec<ModelConfig> {
    nonsquare_models()
}

/// Row of the converted-weights table consumed by the batch promoter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConvertedModel {
    #[serde(rename = "L")]
    pub l: usize,
    pub alpha: usize,
    #[serde(with = "python_bool")]
    pub nonsquare: bool,
    pub directory: String,
    pub version: String,
    pub nspins: usize,
    #[serde(with = "python_bool", default)]
    pub full: bool,
}

impl ConvertedModel {
    /// Promotion input. The spin count is L², the square lattice size.
    pub fn key(&self) -> ModelKey {
        ModelKey::new(self.l * self.l, self.alpha, self.directory.clone())
    }
}

impl From<&ModelConfig> for ConvertedModel {
    fn from(m: &ModelConfig) -> Self {
        Self {
            l: m.l,
            alpha: m.alpha,
            nonsquare: m.nonsquare,
            directory: m.directory.clone(),
            version: m.version.clone(),
            nspins: m.nspins,
            full: false,
        }
    }
}

pub fn converted_models(models: &[ModelConfig]) -> Vec<ConvertedModel> {
    models.iter().map(ConvertedModel::from).collect()
}

/// Write the table as tab-separated values with a header row.
pub fn write_converted_table(path: impl AsRef<Path>, rows: &[ConvertedModel]) -> Result<()> {
    let path = path.as_ref();
    let file = File::create(path).map_err(|e| Error::Io {
        path: path.to_path_buf(),
        source: e,
    })?;
    let mut out = csv::WriterBuilder::new()
        .delimiter(b'\t')
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(file);
    for row in rows {
        out.serialize(row)?;
    }
    out.flush().map_err(|e| Error::Io {
        path: path.to_path_buf(),
        source: e,
    })?;
    Ok(())
}

/// Read a converted-weights table. Unknown columns are ignored.
pub fn read_converted_table(path: impl AsRef<Path>) -> Result<Vec<ConvertedModel>> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| Error::read(path, e))?;
    let mut reader = csv::ReaderBuilder::new().delimiter(b'\t').from_reader(file);
    let mut rows = Vec::new();
    for row in reader.deserialize() {
        rows.push(row?);
    }
    Ok(rows)
}

/// Booleans spelled `True` / `False`, as pandas writes them. Reading is
/// case-insensitive.
mod python_bool {
    use super::*;
    use serde::de::Error as _;

    pub fn serialize<S: Serializer>(value: &bool, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(if *value { "True" } else { "False" })
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<bool, D::Error> {
        let s = String::deserialize(deserializer)?;
        match s.to_ascii_lowercase().as_str() {
            "true" | "1" => Ok(true),
            "false" | "0" => Ok(false),
            other => Err(D::Error::custom(format!("invalid boolean {:?}", other))),
        }
    }
}
