//! Output formatting for the CLI
//!
//! Results render either as short human-readable text or as JSON for
//! scripts.

use clap::ValueEnum;
use layered_config_core::{BranchOutcome, Change, EngineSettings, Source, Value, ValueKind, WriteOutcome};
use serde::Serialize;

/// Output format options for CLI results
#[derive(Copy, Clone, PartialEq, Eq, ValueEnum, Debug, Default)]
pub enum OutputFormat {
    /// Plain text
    #[default]
    Text,
    /// JSON for machine processing
    Json,
}

/// Result of a `get`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GetOutput {
    pub kind: ValueKind,
    pub value: Option<Value>,
    /// Layer that produced the value, if any did
    pub source: Option<Source>,
}

impl GetOutput {
    pub fn render(&self, format: OutputFormat) -> anyhow::Result<String> {
        match format {
            OutputFormat::Json => Ok(serde_json::to_string_pretty(self)?),
            OutputFormat::Text => Ok(match &self.value {
                Some(value) => value.to_string(),
                None => String::new(),
            }),
        }
    }
}

/// Per-target result of a `write`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BranchOutput {
    pub target: String,
    pub change: &'static str,
    pub notified: bool,
}

impl BranchOutput {
    fn new(target: &str, outcome: BranchOutcome) -> Self {
        let change = match outcome.change {
            Change::Unchanged => "unchanged",
            Change::Created => "created",
            Change::Updated => "updated",
        };
        Self {
            target: target.to_string(),
            change,
            notified: outcome.notified,
        }
    }
}

/// Result of a `write`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WriteOutput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub env: Option<BranchOutput>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secret: Option<BranchOutput>,
}

impl WriteOutput {
    pub fn from_outcome(outcome: &WriteOutcome, env: Option<&str>, secret_id: Option<&str>) -> Self {
        Self {
            env: outcome.env.zip(env).map(|(o, name)| BranchOutput::new(name, o)),
            secret: outcome.remote.zip(secret_id).map(|(o, id)| BranchOutput::new(id, o)),
        }
    }

    pub fn render(&self, format: OutputFormat) -> anyhow::Result<String> {
        match format {
            OutputFormat::Json => Ok(serde_json::to_string_pretty(self)?),
            OutputFormat::Text => {
                let lines: Vec<String> = [("env", &self.env), ("secret", &self.secret)]
                    .into_iter()
                    .filter_map(|(label, branch)| {
                        branch
                            .as_ref()
                            .map(|b| format!("{} {}: {}", label, b.target, b.change))
                    })
                    .collect();
                Ok(lines.join("\n"))
            }
        }
    }
}

pub fn render_settings(settings: &EngineSettings, format: OutputFormat) -> anyhow::Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(settings)?),
        OutputFormat::Text => Ok(format!(
            "aws_prefix = {:?}\nsecretsmanager_prefix = {}\naws_session_required = {}",
            settings.aws_prefix,
            settings
                .secretsmanager_prefix
                .as_deref()
                .map(|p| format!("{:?}", p))
                .unwrap_or_else(|| "(none)".to_string()),
            settings.aws_session_required,
        )),
    }
}
