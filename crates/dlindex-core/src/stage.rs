//! Pipeline stage definitions from the `[stage]` section of `Index.toml`.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use dlindex_util::errors::DlIndexError;

/// Wall-clock limit applied when a stage does not set `timeout`.
pub const DEFAULT_STAGE_TIMEOUT: Duration = Duration::from_secs(2 * 60 * 60);

/// Environment variable the CI agent uses to advertise its labels.
pub const AGENT_LABELS_ENV: &str = "NODE_LABELS";

/// A named unit of CI work: credentials, a time limit and ordered steps.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct StageConfig {
    pub name: String,

    /// Label the executing agent must carry.
    #[serde(default)]
    pub agent_label: Option<String>,

    #[serde(default = "default_timeout", with = "duration_str")]
    pub timeout: Duration,

    /// Directory steps run in, relative to the manifest directory.
    #[serde(default)]
    pub working_dir: Option<PathBuf>,

    /// Environment variable name -> credential id.
    #[serde(default)]
    pub credentials: BTreeMap<String, String>,

    #[serde(default)]
    pub steps: Vec<StepConfig>,
}

fn default_timeout() -> Duration {
    DEFAULT_STAGE_TIMEOUT
}

/// Raw `[[stage.steps]]` entry: exactly one of `run` or `builtin`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepConfig {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub run: Option<String>,
    #[serde(default)]
    pub builtin: Option<Builtin>,
}

/// Steps implemented inside dlindex itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Builtin {
    /// Discover artifacts and publish the index, like `dlindex publish`.
    PublishIndex,
}

impl Builtin {
    pub fn as_str(&self) -> &'static str {
        match self {
            Builtin::PublishIndex => "publish-index",
        }
    }
}

/// A validated step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    pub name: String,
    pub action: StepAction,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepAction {
    /// Run through `sh -c`.
    Shell(String),
    Builtin(Builtin),
}

impl StageConfig {
    /// Validate and name the configured steps.
    pub fn steps(&self) -> miette::Result<Vec<Step>> {
        if self.steps.is_empty() {
            return Err(DlIndexError::Manifest {
                message: format!("Stage '{}' has no steps", self.name),
            }
            .into());
        }
        self.steps
            .iter()
            .enumerate()
            .map(|(i, raw)| -> miette::Result<Step> {
                let action = match (&raw.run, raw.builtin) {
                    (Some(cmd), None) if !cmd.trim().is_empty() => StepAction::Shell(cmd.clone()),
                    (None, Some(b)) => StepAction::Builtin(b),
                    _ => {
                        return Err(DlIndexError::Manifest {
                            message: format!(
                                "Step {} of stage '{}' must set exactly one of `run` or `builtin`",
                                i + 1,
                                self.name
                            ),
                        }
                        .into())
                    }
                };
                let name = raw.name.clone().unwrap_or_else(|| match &action {
                    StepAction::Builtin(b) => b.as_str().to_string(),
                    StepAction::Shell(_) => format!("step {}", i + 1),
                });
                Ok(Step { name, action })
            })
            .collect()
    }

    /// Whether an agent advertising `available` (comma or whitespace separated)
    /// may run this stage. Stages without a label run anywhere.
    pub fn accepts_agent(&self, available: &str) -> bool {
        match &self.agent_label {
            None => true,
            Some(required) => available
                .split(|c: char| c == ',' || c.is_whitespace())
                .any(|l| l == required.as_str()),
        }
    }

    /// The configured timeout in humantime notation, e.g. `2h`.
    pub fn timeout_display(&self) -> String {
        humantime::format_duration(self.timeout).to_string()
    }
}

mod duration_str {
    use super::*;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.collect_str(&humantime::format_duration(*d))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let raw = String::deserialize(d)?;
        let parsed = humantime::parse_duration(&raw).map_err(serde::de::Error::custom)?;
        if parsed.is_zero() {
            return Err(serde::de::Error::custom("timeout must be greater than zero"));
        }
        Ok(parsed)
    }
}
