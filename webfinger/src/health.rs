use crate::config::ConfigError;
use crate::config::ConfigFile;
use crate::config::DEFAULT_HOST;
use crate::config::locate;
use crate::webfinger::BadResource;
use clap::Parser;
use reqwest::StatusCode;
use std::path::PathBuf;

#[derive(Clone, Debug, Default, Parser)]
pub struct HealthArgs {
    /// Path to the configuration file of the server.
    ///
    /// Searched for like `serve` does when not set.
    #[arg(long, env = "AUTHENTIK_WEBFINGER_CONFIG")]
    pub config: Option<PathBuf>,
    /// The address the server listens on.
    ///
    /// Defaults to `Host` from the configuration file, or ":8080".
    #[arg(long, env = "AUTHENTIK_WEBFINGER_HOST")]
    pub host: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum HealthError {
    #[error("server did not respond: {0}")]
    Request(#[from] reqwest::Error),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("expected a 400 with {expected:?}, but got {status} with {body:?}")]
    Unexpected {
        expected: String,
        status: StatusCode,
        body: String,
    },
}

/// The address of the server, resolved the same way as by `serve`.
///
/// Without a configuration file the default address is used.
pub fn server_host(args: &HealthArgs) -> Result<String, HealthError> {
    if let Some(host) = args.host.as_ref().filter(|host| !host.is_empty()) {
        return Ok(host.clone());
    }
    let path = match locate(args.config.as_deref()) {
        Ok(path) => path,
        Err(ConfigError::NotFound { .. }) => return Ok(DEFAULT_HOST.to_string()),
        Err(err) => return Err(err.into()),
    };
    let file = ConfigFile::read(&path)?;
    let host = file.host.filter(|host| !host.is_empty());
    Ok(host.unwrap_or_else(|| DEFAULT_HOST.to_string()))
}

/// URL of the WebFinger endpoint of a server listening on `host`.
pub fn health_url(host: &str) -> String {
    let host = if host.starts_with(':') {
        format!("localhost{host}")
    } else {
        host.replace("0.0.0.0", "localhost")
            .replace("[::]", "localhost")
    };
    format!("http://{host}/.well-known/webfinger")
}

#[test]
fn test_health_url() {
    let url = "http://localhost:8080/.well-known/webfinger";
    assert_eq!(health_url(":8080"), url);
    assert_eq!(health_url("0.0.0.0:8080"), url);
    assert_eq!(health_url("[::]:8080"), url);
    assert_eq!(
        health_url("127.0.0.1:3000"),
        "http://127.0.0.1:3000/.well-known/webfinger"
    );
}

/// Check the health of the server described by `args`.
///
/// This allows health checks in containers where `curl` or `wget` is not
/// available. The endpoint is requested without `resource`, which the server
/// answers without contacting authentik.
pub async fn check_health(args: &HealthArgs) -> Result<(), HealthError> {
    let url = health_url(&server_host(args)?);
    let response = reqwest::get(url).await?;
    let status = response.status();
    let body = response.text().await?;
    let expected = BadResource::Missing.to_string();
    if status != StatusCode::BAD_REQUEST || body != expected {
        return Err(HealthError::Unexpected {
            expected,
            status,
            body,
        });
    }
    Ok(())
}
