//! CLI command definitions
//!
//! Each command builds an engine over the process environment and AWS
//! Secrets Manager, performs one operation and prints the result.

use clap::{Parser, Subcommand};
use layered_config_core::value;
use layered_config_core::{ConfigEngine, EngineSettings, Lookup, Value, ValueKind, WriteTarget};
use std::path::PathBuf;

use super::output::{render_settings, GetOutput, OutputFormat, WriteOutput};
use super::ExitCode;

/// Resolve configuration from the environment, AWS Secrets Manager and defaults
#[derive(Parser, Debug)]
#[command(name = "layered-config")]
#[command(about = "Resolve and write layered configuration values", long_about = None)]
#[command(version)]
pub struct LayeredCli {
    /// Output verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// TOML settings file; defaults to LAYERED_CONFIG_* variables
    #[arg(long, global = true, env = "LAYERED_CONFIG_SETTINGS")]
    pub settings: Option<PathBuf>,

    /// Secret prefix for this invocation, overriding the settings
    #[arg(long, global = true)]
    pub secretsmanager_prefix: Option<String>,

    /// Output format
    #[arg(long, value_enum, default_value = "text", global = true)]
    pub format: OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Resolve one value
    ///
    /// Tries the environment variable, then the secret, then the default.
    Get {
        /// Kind to parse the value as (string, integer, float, boolean)
        #[arg(short, long, default_value = "string")]
        kind: ValueKind,

        /// Environment variable to read
        #[arg(short, long)]
        env: Option<String>,

        /// Secret key to read, before the prefix is applied
        #[arg(short, long)]
        secret: Option<String>,

        /// Value used when no source has one
        #[arg(short, long)]
        default: Option<String>,

        /// Fail when no value is found
        #[arg(short, long)]
        required: bool,
    },

    /// Write a value to the environment of this process and/or a secret
    Write {
        /// Value to write
        #[arg(long)]
        value: String,

        /// Environment variable to write
        #[arg(short, long)]
        env: Option<String>,

        /// Secret key to write, before the prefix is applied
        #[arg(short, long)]
        secret: Option<String>,
    },

    /// Print the effective engine settings
    ShowConfig,
}

/// Settings from `--settings` or the environment, with CLI overrides applied
pub fn load_settings(cli: &LayeredCli) -> anyhow::Result<EngineSettings> {
    let settings = match &cli.settings {
        Some(path) => EngineSettings::from_file(path)?,
        None => EngineSettings::from_env()?,
    };
    Ok(match &cli.secretsmanager_prefix {
        Some(prefix) => settings.with_secretsmanager_prefix(prefix.clone()),
        None => settings,
    })
}

pub async fn execute_get(
    settings: EngineSettings,
    format: OutputFormat,
    kind: ValueKind,
    env: Option<String>,
    secret: Option<String>,
    default: Option<String>,
    required: bool,
) -> anyhow::Result<ExitCode> {
    if env.is_none() && secret.is_none() && default.is_none() {
        anyhow::bail!("get needs at least one of --env, --secret or --default");
    }

    let engine = ConfigEngine::new(settings);
    let mut lookup = Lookup::new().required(required);
    if let Some(name) = &env {
        lookup = lookup.env(name.as_str());
    }
    if let Some(key) = &secret {
        lookup = lookup.remote(key.as_str());
    }
    if let Some(default) = default {
        lookup = lookup.with_default(default);
    }

    let raw = engine.get(kind, lookup).await?;
    let value = value::parse(kind, raw.as_ref())?;

    // Environment hits and defaults land in the env cache; store hits only in the remote one.
    let entry = match env.as_deref().map(|name| engine.env_cache().get(name)).transpose()? {
        Some(Some(entry)) => Some(entry),
        _ => secret
            .as_deref()
            .map(|key| engine.remote_cache().get(key))
            .transpose()?
            .flatten(),
    };

    let output = GetOutput {
        kind,
        source: value.as_ref().and(entry.map(|e| e.source)),
        value,
    };
    println!("{}", output.render(format)?);
    Ok(ExitCode::Success)
}

pub async fn execute_write(
    settings: EngineSettings,
    format: OutputFormat,
    value: String,
    env: Option<String>,
    secret: Option<String>,
) -> anyhow::Result<ExitCode> {
    if env.is_none() && secret.is_none() {
        anyhow::bail!("write needs --env and/or --secret");
    }

    let engine = ConfigEngine::new(settings);
    let mut target = WriteTarget::new();
    if let Some(name) = &env {
        target = target.env(name.as_str());
    }
    if let Some(key) = &secret {
        target = target.remote(key.as_str());
    }

    let outcome = engine.write(Some(Value::from(value)), target).await?;

    let secret_id = secret.as_deref().map(|key| engine.secret_id(key, None));
    let output = WriteOutput::from_outcome(&outcome, env.as_deref(), secret_id.as_deref());
    println!("{}", output.render(format)?);
    Ok(ExitCode::Success)
}

pub fn execute_show_config(settings: &EngineSettings, format: OutputFormat) -> anyhow::Result<ExitCode> {
    println!("{}", render_settings(settings, format)?);
    Ok(ExitCode::Success)
}
