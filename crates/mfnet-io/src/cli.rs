use crate::{load_config, write_result_with_manifest, Dataset, RunManifest};
use anyhow::Context;
use clap::{Parser, Subcommand};
use mfnet_core::NetworkConfig;
use mfnet_graph::{GraphBuilder, Severity, ValidationThresholds};
use mfnet_sampler::{rerank, NetworkResult};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "mfnet")]
#[command(about = "mfnet - network-based molecular formula reranking")]
#[command(long_about = "Reranks per-compound formula candidates by Gibbs sampling over a graph of shared fragments and losses")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Rerank a dataset and write rankings plus a run manifest
    Rerank {
        /// Input dataset (JSON)
        #[arg(long)]
        input: PathBuf,

        /// Network configuration (JSON); unset fields use defaults
        #[arg(long)]
        config: Option<PathBuf>,

        /// Number of independent chains
        #[arg(long)]
        chains: Option<usize>,

        /// Recorded sampling sweeps per chain
        #[arg(long)]
        sweeps: Option<usize>,

        /// Discarded burn-in sweeps per chain
        #[arg(long)]
        burn_in: Option<usize>,

        /// Random seed
        #[arg(long)]
        seed: Option<u64>,

        /// Worker threads
        #[arg(long)]
        workers: Option<usize>,

        /// Wall-clock budget for sampling, in seconds
        #[arg(long)]
        time_limit: Option<f64>,

        /// Merge near-duplicate compounds before sampling
        #[arg(long)]
        cluster: bool,

        /// Output JSON file
        #[arg(long)]
        out: PathBuf,
    },

    /// Build the graph and print its connectivity report without sampling
    Validate {
        /// Input dataset (JSON)
        #[arg(long)]
        input: PathBuf,

        /// Network configuration (JSON)
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

/// Command-line values that take precedence over the config file.
#[derive(Clone, Debug, Default)]
pub struct Overrides {
    pub chains: Option<usize>,
    pub sweeps: Option<usize>,
    pub burn_in: Option<usize>,
    pub seed: Option<u64>,
    pub workers: Option<usize>,
    pub time_limit: Option<f64>,
    pub cluster: bool,
}

impl Overrides {
    pub fn apply(&self, mut config: NetworkConfig) -> NetworkConfig {
        if let Some(chains) = self.chains {
            config.chains = chains;
        }
        if let Some(sweeps) = self.sweeps {
            config.sampling_sweeps = sweeps;
        }
        if let Some(burn_in) = self.burn_in {
            config.burn_in_sweeps = burn_in;
        }
        if let Some(seed) = self.seed {
            config.seed = seed;
        }
        if let Some(workers) = self.workers {
            config.workers = workers;
        }
        if let Some(secs) = self.time_limit {
            config.time_limit_secs = Some(secs);
        }
        if self.cluster {
            config.cluster_compounds = true;
        }
        config
    }
}

pub fn run_rerank_command(
    input: &Path,
    config_path: Option<&Path>,
    overrides: &Overrides,
    out: &Path,
) -> anyhow::Result<NetworkResult> {
    let config = overrides.apply(load_config(config_path)?);
    config.validate().context("invalid configuration")?;

    println!("mfnet rerank");
    println!("============");
    println!("Input: {}", input.display());
    println!("Chains: {}", config.chains);
    println!("Burn-in sweeps: {}", config.burn_in_sweeps);
    println!("Sampling sweeps: {}", config.sampling_sweeps);
    println!("Workers: {}", config.workers);
    println!("Seed: {}", config.seed);
    println!("Clustering: {}", if config.cluster_compounds { "on" } else { "off" });
    println!("Output: {}", out.display());

    let manifest = RunManifest::new(input, &config);
    let store = Dataset::load_from_file(input)?.into_store(&config);
    let result = rerank(&store, &config).context("reranking failed")?;

    write_result_with_manifest(&result, &manifest, out)?;
    print_summary(&result);
    Ok(result)
}

pub fn run_validate_command(input: &Path, config_path: Option<&Path>) -> anyhow::Result<Severity> {
    let config = load_config(config_path)?;
    config.validate().context("invalid configuration")?;

    let store = Dataset::load_from_file(input)?.into_store(&config);
    let (graph, build) = GraphBuilder::from_config(&config)
        .build(&store)
        .context("building the candidate graph")?;
    let report = graph.validate(&ValidationThresholds::from_config(&config));

    println!("Compounds: {}", report.compounds);
    println!("Candidates: {}", graph.total_candidates());
    println!("Pairs scored: {}", build.pairs_scored);
    println!("Edges: {} scored, {} after filtering", build.edges_before_filter, build.edges_after_filter);
    println!("Calibration: {:?}", build.calibration);
    println!(
        "Isolated: {} ({:.1}%)",
        report.isolated,
        100.0 * report.isolated_fraction()
    );
    println!(
        "Fewer than {} neighbors: {} ({:.1}%)",
        config.min_neighbor_compounds,
        report.badly_connected,
        100.0 * report.badly_connected_fraction()
    );
    for msg in &report.messages {
        println!("{:?}: {}", report.severity, msg);
    }
    println!("Status: {:?}", report.severity);
    Ok(report.severity)
}

fn print_summary(result: &NetworkResult) {
    let d = &result.diagnostics;
    let changed = result
        .network_ranking
        .iter()
        .zip(&result.prior_ranking)
        .filter(|(n, p)| n.top().map(|c| c.index) != p.top().map(|c| c.index))
        .count();
    let dummy_top = result
        .network_ranking
        .iter()
        .filter(|r| r.top().map_or(false, |c| c.is_dummy))
        .count();

    println!();
    println!("Summary:");
    println!("========");
    println!("Compounds: {} ({} candidates, {} dropped)", d.compounds, d.candidates, d.dropped_candidates);
    if d.clustered_compounds > 0 {
        println!("Clustered into representatives: {}", d.clustered_compounds);
    }
    println!("Edges: {} / {} kept", d.edges_after_filter, d.edges_before_filter);
    println!(
        "Chains: {} ok, {} failed, {} timed out, {} sweeps recorded",
        d.chains_ok, d.chains_failed, d.chains_timed_out, d.recorded_sweeps
    );
    println!("Top candidate changed: {} / {}", changed, result.network_ranking.len());
    println!("Dummy ranked first: {}", dummy_top);
    if d.used_prior_fallback {
        println!("No sweeps recorded, rankings are the prior");
    }
    println!("Elapsed: {:.2}s", d.elapsed_secs);
}
