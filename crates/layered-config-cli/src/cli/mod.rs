//! CLI for layered configuration
//!
//! Resolves a single value, writes one back, or shows the settings an engine
//! would be built with.

pub mod commands;
pub mod output;

pub use commands::{Commands, LayeredCli};

use layered_config_core::ConfigError;

/// Exit codes for CLI operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    /// Command succeeded
    Success = 0,
    /// A required value was found in no source
    RequiredMissing = 1,
    /// Bad arguments, settings or an unparseable value
    InvalidInput = 2,
    /// Secret store or credential failure
    StoreError = 3,
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> Self {
        code as i32
    }
}

impl ExitCode {
    /// Exit code for a failed command
    pub fn from_error(err: &anyhow::Error) -> Self {
        match err.downcast_ref::<ConfigError>() {
            Some(ConfigError::RequiredNotFound { .. }) => ExitCode::RequiredMissing,
            Some(e) if e.is_user_error() => ExitCode::InvalidInput,
            Some(_) => ExitCode::StoreError,
            None => ExitCode::InvalidInput,
        }
    }
}

/// Run the parsed command and return the exit code
pub async fn run(cli: LayeredCli) -> anyhow::Result<ExitCode> {
    let settings = commands::load_settings(&cli)?;
    let format = cli.format;

    match cli.command {
        Commands::Get {
            kind,
            env,
            secret,
            default,
            required,
        } => commands::execute_get(settings, format, kind, env, secret, default, required).await,
        Commands::Write { value, env, secret } => {
            commands::execute_write(settings, format, value, env, secret).await
        }
        Commands::ShowConfig => commands::execute_show_config(&settings, format),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use layered_config_core::{ProviderError, ValueKind};

    #[test]
    fn test_exit_code_conversion() {
        assert_eq!(i32::from(ExitCode::Success), 0);
        assert_eq!(i32::from(ExitCode::RequiredMissing), 1);
        assert_eq!(i32::from(ExitCode::InvalidInput), 2);
        assert_eq!(i32::from(ExitCode::StoreError), 3);
    }

    #[test]
    fn test_exit_code_from_error() {
        let required = anyhow::Error::from(ConfigError::RequiredNotFound {
            env: Some("PORT".into()),
            remote_key: None,
        });
        assert_eq!(ExitCode::from_error(&required), ExitCode::RequiredMissing);

        let parse = anyhow::Error::from(ConfigError::parse(ValueKind::Integer, "x", "invalid digit"));
        assert_eq!(ExitCode::from_error(&parse), ExitCode::InvalidInput);

        let store = anyhow::Error::from(ConfigError::Store(ProviderError::ConnectionError(
            "timeout".into(),
        )));
        assert_eq!(ExitCode::from_error(&store), ExitCode::StoreError);

        let credential = anyhow::Error::from(ConfigError::MissingCredential("AWS_REGION".into()));
        assert_eq!(ExitCode::from_error(&credential), ExitCode::StoreError);

        assert_eq!(
            ExitCode::from_error(&anyhow::anyhow!("bad arguments")),
            ExitCode::InvalidInput
        );
    }

    #[tokio::test]
    async fn test_run_required_missing() {
        let cli = <LayeredCli as clap::Parser>::try_parse_from([
            "layered-config",
            "--secretsmanager-prefix",
            "unused",
            "get",
            "--env",
            "LAYERED_CONFIG_TEST_SURELY_UNSET",
            "--required",
        ])
        .unwrap();

        let err = run(cli).await.unwrap_err();
        assert_eq!(ExitCode::from_error(&err), ExitCode::RequiredMissing);
    }
}
