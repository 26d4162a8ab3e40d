//! Agent families known to the trainer and the metric tags each one emits.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::error::RlbatchError;

/// Agent family selected for a training job.
///
/// The set is closed: every family has a trainer selector and a default
/// metric family, both resolved through [`AgentKind::profile`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AgentKind {
    /// Deep Q-Network.
    Dqn,

    /// Asynchronous advantage actor-critic.
    A3c,
}

/// Static description of an agent family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AgentProfile {
    /// Value passed to the trainer's `--agent` flag.
    pub selector: &'static str,

    /// Heading used in reports.
    pub display_name: &'static str,

    /// Primary reward-like tag.
    pub primary_tag: &'static str,

    /// Secondary tags reported as final values.
    pub secondary_tags: &'static [&'static str],
}

const DQN_PROFILE: AgentProfile = AgentProfile {
    selector: "dqn",
    display_name: "DQN",
    primary_tag: "Reward",
    secondary_tags: &["Loss"],
};

const A3C_PROFILE: AgentProfile = AgentProfile {
    selector: "a3c",
    display_name: "A3C",
    primary_tag: "Global/Reward",
    secondary_tags: &[
        "Global/Policy_Loss",
        "Global/Value_Loss",
        "Global/Entropy_Loss",
    ],
};

impl AgentKind {
    /// All agent families, in report order.
    pub const ALL: [AgentKind; 2] = [AgentKind::Dqn, AgentKind::A3c];

    /// Resolve the static profile for this family.
    pub fn profile(&self) -> &'static AgentProfile {
        match self {
            AgentKind::Dqn => &DQN_PROFILE,
            AgentKind::A3c => &A3C_PROFILE,
        }
    }

    /// Trainer `--agent` selector.
    pub fn selector(&self) -> &'static str {
        self.profile().selector
    }

    /// Default metric tags for this family.
    pub fn default_tags(&self) -> MetricTags {
        let profile = self.profile();
        MetricTags {
            primary: profile.primary_tag.to_string(),
            secondary: profile
                .secondary_tags
                .iter()
                .map(|t| t.to_string())
                .collect(),
        }
    }
}

impl fmt::Display for AgentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.profile().display_name)
    }
}

impl FromStr for AgentKind {
    type Err = RlbatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "dqn" => Ok(AgentKind::Dqn),
            "a3c" => Ok(AgentKind::A3c),
            other => Err(RlbatchError::InvalidBatch(format!(
                "unknown agent kind: {other}"
            ))),
        }
    }
}

/// Tags read for one agent family when building a report.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MetricTags {
    /// Reward-like tag that drives the plot and the results table.
    pub primary: String,

    /// Loss-like tags reported as a final value per run.
    #[serde(default)]
    pub secondary: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selectors() {
        assert_eq!(AgentKind::Dqn.selector(), "dqn");
        assert_eq!(AgentKind::A3c.selector(), "a3c");
    }

    #[test]
    fn test_default_tags() {
        let dqn = AgentKind::Dqn.default_tags();
        assert_eq!(dqn.primary, "Reward");
        assert_eq!(dqn.secondary, vec!["Loss".to_string()]);

        let a3c = AgentKind::A3c.default_tags();
        assert_eq!(a3c.primary, "Global/Reward");
        assert_eq!(a3c.secondary.len(), 3);
        assert!(a3c.secondary.iter().all(|t| t.starts_with("Global/")));
    }

    #[test]
    fn test_parse_is_case_insensitive() {
        assert_eq!("DQN".parse::<AgentKind>().unwrap(), AgentKind::Dqn);
        assert_eq!(" a3c ".parse::<AgentKind>().unwrap(), AgentKind::A3c);
        assert!("ppo".parse::<AgentKind>().is_err());
    }

    #[test]
    fn test_serde_names() {
        let json = serde_json::to_string(&AgentKind::A3c).unwrap();
        assert_eq!(json, "\"a3c\"");
        let parsed: AgentKind = serde_json::from_str("\"dqn\"").unwrap();
        assert_eq!(parsed, AgentKind::Dqn);
    }
}
