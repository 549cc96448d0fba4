use anyhow::Context;
use mfnet_core::{CandidateStore, LibraryHit, NetworkConfig, RawCandidate, StoreBuilder, F};
use mfnet_sampler::NetworkResult;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use uuid::Uuid;

pub mod cli;
pub use cli::*;

/// One measured compound as it arrives from the upstream tree scorer.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CompoundInput {
    pub id: String,
    pub candidates: Vec<RawCandidate>,
    #[serde(default)]
    pub library_hit: Option<LibraryHit>,
    /// Measured precursor ion mass in Da; compounds without one are never clustered.
    #[serde(default)]
    pub precursor_mass: Option<F>,
}

/// JSON input file: every compound with its scored candidates.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Dataset {
    pub compounds: Vec<CompoundInput>,
}

impl Dataset {
    pub fn load_from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).with_context(|| format!("reading dataset {}", path.display()))?;
        let dataset = serde_json::from_str(&json).with_context(|| format!("parsing dataset {}", path.display()))?;
        Ok(dataset)
    }

    /// Validates candidates and appends dummies using `config`'s dummy score,
    /// truncation limit and library trust policy. Clusters duplicates when
    /// `config.cluster_compounds` is set.
    pub fn into_store(self, config: &NetworkConfig) -> CandidateStore {
        let mut builder = StoreBuilder::from_config(config);
        for compound in self.compounds {
            let idx = builder.add_compound(compound.id, compound.candidates);
            if let Some(hit) = compound.library_hit {
                builder.add_library_hit(idx, hit);
            }
            if let Some(mass) = compound.precursor_mass {
                builder.set_precursor_mass(idx, mass);
            }
        }
        builder.build()
    }
}

/// Everything needed to reproduce a reranking run.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RunManifest {
    pub run_id: String,
    pub timestamp: String,
    pub input: String,
    pub seed: u64,
    pub config: NetworkConfig,
    pub compounds: usize,
    pub candidates: usize,
    pub elapsed_secs: f64,
    pub commit_hash: Option<String>,
    pub rust_version: String,
}

impl RunManifest {
    pub fn new(input: &Path, config: &NetworkConfig) -> Self {
        Self {
            run_id: Uuid::new_v4().to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
            input: input.display().to_string(),
            seed: config.seed,
            config: config.clone(),
            compounds: 0,
            candidates: 0,
            elapsed_secs: 0.0,
            commit_hash: get_git_commit(),
            rust_version: get_rust_version(),
        }
    }

    /// Copies the run size and timing out of a finished result.
    pub fn record(&mut self, result: &NetworkResult) {
        self.compounds = result.diagnostics.compounds;
        self.candidates = result.diagnostics.candidates;
        self.elapsed_secs = result.diagnostics.elapsed_secs;
    }

    pub fn save_to_file(&self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path.as_ref(), json)?;
        Ok(())
    }

    pub fn load_from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let json = std::fs::read_to_string(path.as_ref())?;
        let manifest = serde_json::from_str(&json)?;
        Ok(manifest)
    }
}

/// `result.json` -> `result.manifest.json`
pub fn manifest_path(out: &Path) -> PathBuf {
    out.with_extension("manifest.json")
}

/// Loads a JSON config, or the defaults when no path is given.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<NetworkConfig> {
    match path {
        Some(path) => {
            let json = std::fs::read_to_string(path).with_context(|| format!("reading config {}", path.display()))?;
            let config = serde_json::from_str(&json).with_context(|| format!("parsing config {}", path.display()))?;
            Ok(config)
        }
        None => Ok(NetworkConfig::default()),
    }
}

/// Writes the result and its manifest next to each other.
pub fn write_result_with_manifest(result: &NetworkResult, manifest: &RunManifest, out: &Path) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(result)?;
    std::fs::write(out, json).with_context(|| format!("writing result {}", out.display()))?;

    let manifest_out = manifest_path(out);
    let mut manifest = manifest.clone();
    manifest.record(result);
    manifest.save_to_file(&manifest_out)?;

    println!("Wrote rankings for {} compounds to {}", result.network_ranking.len(), out.display());
    println!("Wrote manifest to {}", manifest_out.display());
    Ok(())
}

fn get_git_commit() -> Option<String> {
    std::process::Command::new("git")
        .args(["rev-parse", "HEAD"])
        .output()
        .ok()
        .and_then(|output| {
            if output.status.success() {
                String::from_utf8(output.stdout).ok()
            } else {
                None
            }
        })
        .map(|s| s.trim().to_string())
}

fn get_rust_version() -> String {
    std::process::Command::new("rustc")
        .arg("--version")
        .output()
        .ok()
        .and_then(|output| {
            if output.status.success() {
                String::from_utf8(output.stdout).ok()
            } else {
                None
            }
        })
        .map(|s| s.trim().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}
