//! Batch definition files.
//!
//! A batch file is TOML: global settings, the trainer invocation, optional
//! per-family metric tag overrides and an ordered `[[jobs]]` list.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::domain::{AgentKind, JobDescriptor, MetricTags, Result, RlbatchError};

pub const DEFAULT_INTER_JOB_DELAY_SECS: u64 = 30;
pub const DEFAULT_LOG_ROOT: &str = "results/logs";
pub const DEFAULT_ANALYSIS_DIR: &str = "results/analysis";

/// Batch file written by `rlbatch init`.
pub const DEFAULT_BATCH_TOML: &str = r#"# rlbatch experiment batch
inter_job_delay_secs = 30
log_root = "results/logs"
analysis_dir = "results/analysis"

[trainer]
program = "python"
args = ["-u", "scripts/train.py"]

[[jobs]]
agent = "dqn"
config = "configs/dqn_config_lr_low.yaml"
name = "DQN - Low Learning Rate (0.0001)"
log_dir = "DQN_lr_0.0001"

[[jobs]]
agent = "dqn"
config = "configs/dqn_config_lr_high.yaml"
name = "DQN - High Learning Rate (0.01)"
log_dir = "DQN_lr_0.01"

[[jobs]]
agent = "dqn"
config = "configs/dqn_config_gamma_low.yaml"
name = "DQN - Low Gamma (0.95)"
log_dir = "DQN_gamma_0.95"

[[jobs]]
agent = "dqn"
config = "configs/dqn_config_simple_net.yaml"
name = "DQN - Simple Network"
log_dir = "DQN_simple_net"

[[jobs]]
agent = "a3c"
config = "configs/a3c_config_lr_low.yaml"
name = "A3C - Low Learning Rate (0.00001)"
log_dir = "A3C_lr_0.00001"

[[jobs]]
agent = "a3c"
config = "configs/a3c_config_entropy_zero.yaml"
name = "A3C - Zero Entropy Coefficient"
log_dir = "A3C_entropy_0"
"#;

/// How the trainer process is launched.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct TrainerConfig {
    /// Executable to spawn.
    pub program: String,

    /// Arguments placed before `--agent` and `--config`.
    #[serde(default)]
    pub args: Vec<String>,

    /// Working directory of the trainer; inherits ours when unset.
    #[serde(default)]
    pub working_dir: Option<PathBuf>,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            program: "python".to_string(),
            args: vec!["-u".to_string(), "scripts/train.py".to_string()],
            working_dir: None,
        }
    }
}

/// One `[[jobs]]` entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct JobEntry {
    pub agent: AgentKind,
    pub config: PathBuf,
    pub name: String,

    /// Log store of the run, relative to `log_root` unless absolute.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_dir: Option<PathBuf>,
}

/// A parsed batch file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct BatchConfig {
    #[serde(default = "default_inter_job_delay_secs")]
    pub inter_job_delay_secs: u64,

    #[serde(default = "default_log_root")]
    pub log_root: PathBuf,

    #[serde(default = "default_analysis_dir")]
    pub analysis_dir: PathBuf,

    #[serde(default)]
    pub trainer: TrainerConfig,

    /// Tag overrides keyed by agent selector (`dqn`, `a3c`).
    #[serde(default)]
    pub metrics: BTreeMap<String, MetricTags>,

    #[serde(default)]
    pub jobs: Vec<JobEntry>,
}

fn default_inter_job_delay_secs() -> u64 {
    DEFAULT_INTER_JOB_DELAY_SECS
}

fn default_log_root() -> PathBuf {
    PathBuf::from(DEFAULT_LOG_ROOT)
}

fn default_analysis_dir() -> PathBuf {
    PathBuf::from(DEFAULT_ANALYSIS_DIR)
}

impl BatchConfig {
    /// Read, parse and validate a batch file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            RlbatchError::Config(format!("cannot read batch file {}: {e}", path.display()))
        })?;
        let config = Self::from_toml_str(&content)?;
        tracing::debug!(path = ?path, jobs = config.jobs.len(), "loaded batch file");
        Ok(config)
    }

    /// Parse and validate batch TOML.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: BatchConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Check the invariants a batch must satisfy before anything runs.
    pub fn validate(&self) -> Result<()> {
        if self.trainer.program.trim().is_empty() {
            return Err(RlbatchError::Config(
                "trainer program must not be empty".to_string(),
            ));
        }
        if self.jobs.is_empty() {
            return Err(RlbatchError::InvalidBatch(
                "batch declares no jobs".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for (idx, job) in self.jobs.iter().enumerate() {
            if job.name.trim().is_empty() {
                return Err(RlbatchError::InvalidBatch(format!(
                    "job {} has an empty name",
                    idx + 1
                )));
            }
            if !seen.insert(job.name.as_str()) {
                return Err(RlbatchError::InvalidBatch(format!(
                    "duplicate job name: {}",
                    job.name
                )));
            }
        }

        self.metric_tags()?;
        Ok(())
    }

    /// Metric tag overrides keyed by family.
    pub fn metric_tags(&self) -> Result<BTreeMap<AgentKind, MetricTags>> {
        let mut out = BTreeMap::new();
        for (key, tags) in &self.metrics {
            let kind: AgentKind = key
                .parse()
                .map_err(|_| RlbatchError::Config(format!("unknown metrics family: {key}")))?;
            if tags.primary.trim().is_empty() {
                return Err(RlbatchError::Config(format!(
                    "metrics.{key}.primary must not be empty"
                )));
            }
            out.insert(kind, tags.clone());
        }
        Ok(out)
    }

    /// Job descriptors in declaration order, with log directories resolved
    /// against `log_root`.
    pub fn descriptors(&self) -> Vec<JobDescriptor> {
        self.jobs
            .iter()
            .map(|job| {
                let descriptor = JobDescriptor::new(job.agent, &job.config, &job.name);
                match &job.log_dir {
                    Some(dir) => descriptor.with_log_dir(self.log_root.join(dir)),
                    None => descriptor,
                }
            })
            .collect()
    }

    pub fn inter_job_delay(&self) -> Duration {
        Duration::from_secs(self.inter_job_delay_secs)
    }
}

/// Deterministic SHA-256 over the ordered `(agent, config, name)` triples.
pub fn compute_batch_digest(descriptors: &[JobDescriptor]) -> String {
    let mut hasher = Sha256::new();
    for d in descriptors {
        hasher.update(d.agent_kind.selector().as_bytes());
        hasher.update(b"\0");
        hasher.update(d.config_reference.to_string_lossy().as_bytes());
        hasher.update(b"\0");
        hasher.update(d.display_name.as_bytes());
        hasher.update(b"\0");
    }
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
[[jobs]]
agent = "dqn"
config = "configs/dqn.yaml"
name = "DQN baseline"
log_dir = "DQN"
"#;

    #[test]
    fn test_default_batch_parses() {
        let config = BatchConfig::from_toml_str(DEFAULT_BATCH_TOML).expect("default batch");
        assert_eq!(config.jobs.len(), 6);
        assert_eq!(config.inter_job_delay_secs, 30);
        assert_eq!(config.trainer, TrainerConfig::default());
        assert_eq!(config.jobs[4].agent, AgentKind::A3c);
    }

    #[test]
    fn test_defaults_applied() {
        let config = BatchConfig::from_toml_str(MINIMAL).unwrap();
        assert_eq!(config.inter_job_delay(), Duration::from_secs(30));
        assert_eq!(config.log_root, PathBuf::from("results/logs"));
        assert_eq!(config.analysis_dir, PathBuf::from("results/analysis"));
        assert_eq!(config.trainer.program, "python");
    }

    #[test]
    fn test_descriptors_resolve_log_dir() {
        let config = BatchConfig::from_toml_str(MINIMAL).unwrap();
        let descriptors = config.descriptors();
        assert_eq!(descriptors.len(), 1);
        assert_eq!(descriptors[0].display_name, "DQN baseline");
        assert_eq!(
            descriptors[0].log_dir,
            Some(PathBuf::from("results/logs/DQN"))
        );
    }

    #[test]
    fn test_absolute_log_dir_kept() {
        let toml = r#"
[[jobs]]
agent = "a3c"
config = "a3c.yaml"
name = "A3C"
log_dir = "/tmp/a3c-run"
"#;
        let config = BatchConfig::from_toml_str(toml).unwrap();
        assert_eq!(
            config.descriptors()[0].log_dir,
            Some(PathBuf::from("/tmp/a3c-run"))
        );
    }

    #[test]
    fn test_empty_batch_rejected() {
        let err = BatchConfig::from_toml_str("inter_job_delay_secs = 1\n").unwrap_err();
        assert!(matches!(err, RlbatchError::InvalidBatch(_)));
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let toml = format!("{MINIMAL}{MINIMAL}");
        let err = BatchConfig::from_toml_str(&toml).unwrap_err();
        assert!(err.to_string().contains("duplicate job name"));
    }

    #[test]
    fn test_unknown_agent_rejected() {
        let toml = r#"
[[jobs]]
agent = "ppo"
config = "ppo.yaml"
name = "PPO"
"#;
        assert!(matches!(
            BatchConfig::from_toml_str(toml),
            Err(RlbatchError::TomlParse(_))
        ));
    }

    #[test]
    fn test_metric_overrides() {
        let toml = format!(
            "{MINIMAL}\n[metrics.dqn]\nprimary = \"Episode Reward\"\nsecondary = [\"TD Loss\"]\n"
        );
        let config = BatchConfig::from_toml_str(&toml).unwrap();
        let tags = config.metric_tags().unwrap();
        assert_eq!(tags[&AgentKind::Dqn].primary, "Episode Reward");
        assert_eq!(tags[&AgentKind::Dqn].secondary, vec!["TD Loss".to_string()]);
    }

    #[test]
    fn test_unknown_metrics_family_rejected() {
        let toml = format!("{MINIMAL}\n[metrics.ppo]\nprimary = \"Reward\"\n");
        let err = BatchConfig::from_toml_str(&toml).unwrap_err();
        assert!(err.to_string().contains("unknown metrics family"));
    }

    #[test]
    fn test_empty_trainer_program_rejected() {
        let toml = format!("[trainer]\nprogram = \"\"\n{MINIMAL}");
        let err = BatchConfig::from_toml_str(&toml).unwrap_err();
        assert!(matches!(err, RlbatchError::Config(_)));
    }

    #[test]
    fn test_batch_digest_deterministic_and_order_sensitive() {
        let a = JobDescriptor::new(AgentKind::Dqn, "a.yaml", "A");
        let b = JobDescriptor::new(AgentKind::A3c, "b.yaml", "B");

        let d1 = compute_batch_digest(&[a.clone(), b.clone()]);
        let d2 = compute_batch_digest(&[a.clone(), b.clone()]);
        let d3 = compute_batch_digest(&[b, a]);

        assert_eq!(d1, d2);
        assert_ne!(d1, d3);
        assert_eq!(d1.len(), 64);
    }
}
