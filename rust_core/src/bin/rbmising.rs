use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use ndarray::Array1;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rbmising_core::autocorrelation::{self, AutocorrelationReport};
use rbmising_core::batch::{self, BatchOptions};
use rbmising_core::ising::RbmParams;
use rbmising_core::models::{self, Preset};
use rbmising_core::promotion::{self, ModelKey, WeightPromoter, DEFAULT_MODEL_ROOT};
use rbmising_core::sampler::{self, SamplerConfig};
use rbmising_core::table;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Convert RBM weights to Ising couplings and measure autocorrelation times"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Promote every model listed in a converted-weights table
    Promote {
        /// Root directory holding one sub-directory per model
        #[arg(long, default_value = DEFAULT_MODEL_ROOT)]
        root: PathBuf,

        /// Tab-separated table with L, alpha and directory columns
        #[arg(long, default_value = "models/all_weights_converted.tsv")]
        table: PathBuf,

        /// Convert models in parallel
        #[arg(long)]
        parallel: bool,

        /// Worker threads for --parallel (0 = all cores)
        #[arg(long, default_value_t = 0)]
        threads: usize,

        /// Hide the progress bar
        #[arg(long)]
        quiet: bool,

        /// Render a heatmap of every converted coupling matrix
        #[cfg(feature = "plots")]
        #[arg(long)]
        report: bool,
    },

    /// Write the converted-weights table for a model set
    Configs {
        #[arg(long, default_value = "models/all_weights_converted.tsv")]
        output: PathBuf,

        #[arg(long, value_enum, default_value_t = ModelSet::Final)]
        set: ModelSet,

        /// Restrict to one training preset (2k_nonsquare, 10k_nonsquare, 2k_standard, 10k_standard)
        #[arg(long, value_parser = parse_preset, conflicts_with = "set")]
        preset: Option<Preset>,
    },

    /// Integrated autocorrelation time of a single-column sample file
    Autocorr {
        /// Headerless file with one energy per line
        input: PathBuf,
    },

    /// Sample an RBM with block Gibbs chains and report energy autocorrelation
    Gibbs {
        #[arg(long, default_value_t = 36)]
        nspins: usize,

        #[arg(long, default_value_t = 2)]
        alpha: usize,

        /// Load W_RBM weights from this model directory instead of drawing random ones
        #[arg(long)]
        directory: Option<String>,

        #[arg(long, default_value = DEFAULT_MODEL_ROOT)]
        root: PathBuf,

        #[arg(long, default_value_t = 4)]
        chains: usize,

        #[arg(long, default_value_t = 10_000)]
        sweeps: usize,

        #[arg(long, default_value_t = 1_000)]
        burnin: usize,

        #[arg(long, default_value_t = 42)]
        seed: u64,

        #[arg(long, default_value_t = 0)]
        threads: usize,

        /// Write the energies of the first chain to this file
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ModelSet {
    Final,
    Train,
    Standard,
}

fn parse_preset(name: &str) -> std::result::Result<Preset, String> {
    Preset::ALL
        .into_iter()
        .find(|p| p.name() == name)
        .ok_or_else(|| format!("unknown preset '{}'", name))
}

fn init_tracing() {
    let filter =
        EnvFilter::try_from_env("RBMISING_LOG").unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Command::Promote {
            root,
            table,
            parallel,
            threads,
            quiet,
            #[cfg(feature = "plots")]
            report,
        } => {
            let rows = models::read_converted_table(&table)
                .with_context(|| format!("failed to read {}", table.display()))?;
            let keys: Vec<ModelKey> = rows.iter().map(|r| r.key()).collect();

            if threads > 0 {
                rayon::ThreadPoolBuilder::new()
                    .num_threads(threads)
                    .build_global()
                    .ok();
            }

            #[allow(unused_mut)]
            let mut promoter = WeightPromoter::new(root);
            #[cfg(feature = "plots")]
            if report {
                promoter = promoter.with_renderer(rbmising_core::render::HeatmapRenderer::default());
            }

            let options = BatchOptions {
                parallel,
                progress: !quiet,
            };
            let report = batch::promote_all(&promoter, &keys, &options);
            println!("{}", report.summary());
            if report.failed() > 0 {
                bail!("{} of {} models failed to convert", report.failed(), keys.len());
            }
        }

        Command::Configs {
            output,
            set,
            preset,
        } => {
            let models = match (preset, set) {
                (Some(preset), _) => models::preset_models(preset),
                (None, ModelSet::Final) => models::final_models(),
                (None, ModelSet::Train) => models::train_models(),
                (None, ModelSet::Standard) => models::standard_models(),
            };
            if let Some(dir) = output.parent().filter(|d| !d.as_os_str().is_empty()) {
                std::fs::create_dir_all(dir)
                    .with_context(|| format!("failed to create {}", dir.display()))?;
            }
            let rows = models::converted_models(&models);
            models::write_converted_table(&output, &rows)
                .with_context(|| format!("failed to write {}", output.display()))?;
            println!("Wrote {} models to {}", rows.len(), output.display());
        }

        Command::Autocorr { input } => {
            let chain = table::read_column(&input)
                .with_context(|| format!("failed to read {}", input.display()))?;
            println!(
                "Calculating integrated autocorrelation time from {} energy measurements...",
                chain.len()
            );
            let est = autocorrelation::estimate(&chain)?;
            println!("Integrated autocorrelation time: {}", est.tau_int);
            println!("Cutoff time C: {}", est.cutoff);
        }

        Command::Gibbs {
            nspins,
            alpha,
            directory,
            root,
            chains,
            sweeps,
            burnin,
            seed,
            threads,
            output,
        } => {
            let rbm = match directory {
                Some(directory) => {
                    let key = ModelKey::new(nspins, alpha, directory);
                    let paths = promotion::ArtifactPaths::new(&root, &key);
                    promotion::load_rbm(&paths)
                        .with_context(|| format!("failed to load RBM {}", key))?
                }
                None => {
                    let mut rng = ChaCha8Rng::seed_from_u64(seed);
                    RbmParams::random(nspins, alpha, &mut rng)
                }
            };

            let config = SamplerConfig {
                num_chains: chains,
                num_sweeps: sweeps,
                num_burnin: burnin,
                seed,
                num_threads: threads,
            };
            let result = sampler::sample(&rbm, &config)?;
            let report: AutocorrelationReport = result.autocorrelation();
            println!(
                "{} chains × {} sweeps, N = {}, M = {}\n",
                chains,
                sweeps,
                rbm.num_visible(),
                rbm.num_hidden()
            );
            println!("{}", report.to_table());

            if let Some(path) = output {
                table::write_vector(&path, &Array1::from(result.energies[0].clone()))
                    .with_context(|| format!("failed to write {}", path.display()))?;
            }
        }
    }

    Ok(())
}
