pub mod config;
pub mod health;
pub mod serve;
pub mod webfinger;

use clap::Parser;
use std::path::PathBuf;

/// Overrides for the values in the configuration file.
///
/// Every override can also be set via an environment variable. Empty values
/// are ignored.
#[derive(Clone, Debug, Default, Parser)]
pub struct ServeArgs {
    /// Path to the configuration file.
    ///
    /// When not set, `config.toml` is searched for in the working directory,
    /// `$HOME/.config/authentik-webfinger` and `$HOME/.authentik-webfinger`.
    #[arg(long, env = "AUTHENTIK_WEBFINGER_CONFIG")]
    pub config: Option<PathBuf>,
    /// The address to listen on, for example ":8080" or "127.0.0.1:8080".
    #[arg(long, env = "AUTHENTIK_WEBFINGER_HOST")]
    pub host: Option<String>,
    /// The hostname of the authentik instance, for example "auth.example.com".
    #[arg(long, env = "AUTHENTIK_WEBFINGER_AUTHENTIKHOST")]
    pub authentik_host: Option<String>,
    /// The API token for authentik.
    #[arg(long, env = "AUTHENTIK_WEBFINGER_TOKEN", hide_env_values = true)]
    pub token: Option<String>,
    /// The User-Agent header that is sent to authentik.
    #[arg(long, env = "AUTHENTIK_WEBFINGER_USERAGENT")]
    pub user_agent: Option<String>,
    /// The slug of the authentik application that is advertised as issuer.
    #[arg(long, env = "AUTHENTIK_WEBFINGER_AUTHENTIKAPPLICATION")]
    pub authentik_application: Option<String>,
}
