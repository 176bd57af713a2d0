//! Command-line and environment configuration.
//!
//! Every option can come from a flag or an environment variable; a `.env`
//! file in the working directory is loaded before parsing. The parsed
//! [`Cli`] is resolved once into a [`Config`], which is what the handler
//! receives.

use crate::browser::BrowserProfile;
use crate::ingest::RetryPolicy;
use clap::Parser;
use std::path::PathBuf;

/// Command-line arguments for the headline ingest job.
///
/// # Examples
///
/// ```sh
/// # Local run against a development database
/// POSTGRES_CONNECTION_STRING_DEV=postgres://localhost/news headline_ingest
///
/// # Managed profile with a bundled Chromium
/// AWS_EXECUTION_ENV=AWS_Lambda_nodejs18.x headline_ingest \
///     --database-url postgres://db/news --chromium-executable /tmp/chromium
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Postgres connection string
    #[arg(long, env = "POSTGRES_CONNECTION_STRING_DEV", hide_env_values = true)]
    pub database_url: String,

    /// Set by the managed runtime; its presence selects the managed browser profile
    #[arg(long, env = "AWS_EXECUTION_ENV")]
    pub aws_execution_env: Option<String>,

    /// Chromium binary used by the managed profile
    #[arg(long, env = "CHROMIUM_EXECUTABLE_PATH", default_value = "/tmp/chromium")]
    pub chromium_executable: PathBuf,

    /// Attempts per article before it is skipped
    #[arg(long, default_value_t = 3, value_parser = clap::value_parser!(u32).range(1..))]
    pub max_attempts: u32,
}

/// Resolved run configuration.
#[derive(Clone)]
pub struct Config {
    pub database_url: String,
    pub profile: BrowserProfile,
    pub retry: RetryPolicy,
}

impl Cli {
    pub fn into_config(self) -> Config {
        let profile = match self.aws_execution_env.as_deref() {
            Some(env) if !env.is_empty() => BrowserProfile::Managed {
                executable: self.chromium_executable,
            },
            _ => BrowserProfile::Local,
        };
        Config {
            database_url: self.database_url,
            profile,
            retry: RetryPolicy {
                max_attempts: self.max_attempts,
            },
        }
    }
}
