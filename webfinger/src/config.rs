//! Configuration file and overrides.
use crate::ServeArgs;
use serde::Deserialize;
use std::fmt;
use std::path::Path;
use std::path::PathBuf;

pub const DEFAULT_HOST: &str = ":8080";
const FILE_NAME: &str = "config.toml";
const APP_DIR: &str = "authentik-webfinger";

fn join_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|path| path.display().to_string())
        .collect::<Vec<String>>()
        .join(", ")
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config file config.toml not found in {}", join_paths(.searched))]
    NotFound { searched: Vec<PathBuf> },
    #[error("could not read config file {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("could not parse config file {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("missing required configuration key {0}")]
    Missing(&'static str),
}

/// Contents of `config.toml`.
///
/// Keys are accepted as written in the documentation (`AuthentikHost`), in
/// lowercase (`authentikhost`) or in snake case (`authentik_host`).
#[derive(Debug, Default, Deserialize)]
pub struct ConfigFile {
    #[serde(rename = "Host", alias = "host")]
    pub host: Option<String>,
    #[serde(
        rename = "AuthentikHost",
        alias = "authentikhost",
        alias = "authentik_host"
    )]
    pub authentik_host: Option<String>,
    #[serde(rename = "Token", alias = "token")]
    pub token: Option<String>,
    #[serde(rename = "UserAgent", alias = "useragent", alias = "user_agent")]
    pub user_agent: Option<String>,
    #[serde(
        rename = "AuthentikApplication",
        alias = "authentikapplication",
        alias = "authentik_application"
    )]
    pub authentik_application: Option<String>,
}

impl ConfigFile {
    pub fn parse(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }
    pub fn read(path: &Path) -> Result<Self, ConfigError> {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(source) => {
                let path = path.to_path_buf();
                return Err(ConfigError::Read { path, source });
            }
        };
        match Self::parse(&text) {
            Ok(file) => Ok(file),
            Err(source) => {
                let path = path.to_path_buf();
                Err(ConfigError::Parse { path, source })
            }
        }
    }
}

/// Directories that are searched for `config.toml`, in order.
pub fn search_dirs(home: Option<&Path>) -> Vec<PathBuf> {
    let mut dirs = vec![PathBuf::from(".")];
    if let Some(home) = home {
        dirs.push(home.join(".config").join(APP_DIR));
        dirs.push(home.join(format!(".{APP_DIR}")));
    }
    dirs
}

#[test]
fn test_search_dirs() {
    let dirs = search_dirs(Some(Path::new("/home/alice")));
    let expected = [
        ".",
        "/home/alice/.config/authentik-webfinger",
        "/home/alice/.authentik-webfinger",
    ];
    assert_eq!(dirs, expected.map(PathBuf::from));
    assert_eq!(search_dirs(None), vec![PathBuf::from(".")]);
}

/// Return the first `config.toml` in `dirs`.
pub fn find_file(dirs: &[PathBuf]) -> Result<PathBuf, ConfigError> {
    dirs.iter()
        .map(|dir| dir.join(FILE_NAME))
        .find(|path| path.is_file())
        .ok_or_else(|| ConfigError::NotFound {
            searched: dirs.to_vec(),
        })
}

/// `explicit` if set, otherwise the first `config.toml` in [`search_dirs`].
pub fn locate(explicit: Option<&Path>) -> Result<PathBuf, ConfigError> {
    match explicit {
        Some(path) => Ok(path.to_path_buf()),
        None => {
            let home = std::env::var_os("HOME").map(PathBuf::from);
            find_file(&search_dirs(home.as_deref()))
        }
    }
}

/// Addresses to try binding to, in order.
///
/// An address without host such as ":8080" listens on all interfaces: on
/// IPv6 and IPv4 where the system allows dual-stack sockets, and on IPv4 only
/// when IPv6 is unavailable.
pub fn listen_addrs(host: &str) -> Vec<String> {
    if host.starts_with(':') {
        vec![format!("[::]{host}"), format!("0.0.0.0{host}")]
    } else {
        vec![host.to_string()]
    }
}

#[test]
fn test_listen_addrs() {
    assert_eq!(listen_addrs(":8080"), vec!["[::]:8080", "0.0.0.0:8080"]);
    assert_eq!(listen_addrs("127.0.0.1:3000"), vec!["127.0.0.1:3000"]);
    assert_eq!(listen_addrs("[::1]:3000"), vec!["[::1]:3000"]);
}

/// Process-wide settings; immutable once loaded.
#[derive(Clone, PartialEq, Eq)]
pub struct Config {
    /// Address to listen on.
    pub host: String,
    pub authentik_host: String,
    pub token: String,
    pub user_agent: String,
    pub authentik_application: String,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("host", &self.host)
            .field("authentik_host", &self.authentik_host)
            .field("token", &"<redacted>")
            .field("user_agent", &self.user_agent)
            .field("authentik_application", &self.authentik_application)
            .finish()
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|value| !value.is_empty())
}

fn pick(arg: &Option<String>, file: Option<String>) -> Option<String> {
    non_empty(arg.clone()).or(non_empty(file))
}

fn required(
    key: &'static str,
    arg: &Option<String>,
    file: Option<String>,
) -> Result<String, ConfigError> {
    pick(arg, file).ok_or(ConfigError::Missing(key))
}

impl Config {
    /// Locate and read the configuration file, then apply `args` on top.
    pub fn load(args: &ServeArgs) -> Result<Self, ConfigError> {
        let path = locate(args.config.as_deref())?;
        tracing::info!("Reading configuration from {}", path.display());
        let file = ConfigFile::read(&path)?;
        Self::resolve(file, args)
    }
    /// Combine file values with overrides; overrides win.
    pub fn resolve(file: ConfigFile, args: &ServeArgs) -> Result<Self, ConfigError> {
        let host = pick(&args.host, file.host).unwrap_or_else(|| DEFAULT_HOST.to_string());
        Ok(Self {
            host,
            authentik_host: required("AuthentikHost", &args.authentik_host, file.authentik_host)?,
            token: required("Token", &args.token, file.token)?,
            user_agent: required("UserAgent", &args.user_agent, file.user_agent)?,
            authentik_application: required(
                "AuthentikApplication",
                &args.authentik_application,
                file.authentik_application,
            )?,
        })
    }
    pub fn listen_addrs(&self) -> Vec<String> {
        listen_addrs(&self.host)
    }
}

#[cfg(test)]
const EXAMPLE: &str = r#"
AuthentikHost = "auth.example.com"
Token = "secret"
UserAgent = "authentik-webfinger/0.1"
AuthentikApplication = "tailscale"
"#;

#[test]
fn test_resolve_defaults() {
    let file = ConfigFile::parse(EXAMPLE).unwrap();
    let config = Config::resolve(file, &ServeArgs::default()).unwrap();
    assert_eq!(config.host, ":8080");
    assert_eq!(config.listen_addrs(), vec!["[::]:8080", "0.0.0.0:8080"]);
    assert_eq!(config.authentik_host, "auth.example.com");
    assert_eq!(config.token, "secret");
    assert_eq!(config.user_agent, "authentik-webfinger/0.1");
    assert_eq!(config.authentik_application, "tailscale");
}

#[test]
fn test_resolve_overrides() {
    let file = ConfigFile::parse(EXAMPLE).unwrap();
    let args = ServeArgs {
        host: Some("127.0.0.1:3000".to_string()),
        token: Some("from-env".to_string()),
        // Empty overrides are ignored.
        user_agent: Some("".to_string()),
        ..ServeArgs::default()
    };
    let config = Config::resolve(file, &args).unwrap();
    assert_eq!(config.listen_addrs(), vec!["127.0.0.1:3000"]);
    assert_eq!(config.token, "from-env");
    assert_eq!(config.user_agent, "authentik-webfinger/0.1");
}

#[test]
fn test_key_spellings() {
    let text = r#"
        host = ":9000"
        authentikhost = "a.example.com"
        token = "t"
        user_agent = "ua"
        authentik_application = "app"
        unrelated = 1
    "#;
    let file = ConfigFile::parse(text).unwrap();
    let config = Config::resolve(file, &ServeArgs::default()).unwrap();
    assert_eq!(config.host, ":9000");
    assert_eq!(config.authentik_host, "a.example.com");
    assert_eq!(config.user_agent, "ua");
    assert_eq!(config.authentik_application, "app");
}

#[test]
fn test_missing_keys() {
    let file = ConfigFile::parse("AuthentikHost = \"a\"\nToken = \"\"").unwrap();
    let err = Config::resolve(file, &ServeArgs::default()).unwrap_err();
    assert!(matches!(err, ConfigError::Missing("Token")));

    let args = ServeArgs {
        token: Some("t".to_string()),
        user_agent: Some("ua".to_string()),
        ..ServeArgs::default()
    };
    let file = ConfigFile::parse("AuthentikHost = \"a\"").unwrap();
    let err = Config::resolve(file, &args).unwrap_err();
    assert_eq!(
        err.to_string(),
        "missing required configuration key AuthentikApplication"
    );
}

#[test]
fn test_parse_error() {
    assert!(ConfigFile::parse("Token = 1").is_err());
    assert!(ConfigFile::parse("Token = ").is_err());
}

#[test]
fn test_debug_redacts_token() {
    let file = ConfigFile::parse(EXAMPLE).unwrap();
    let config = Config::resolve(file, &ServeArgs::default()).unwrap();
    let debug = format!("{config:?}");
    assert!(!debug.contains("secret"));
    assert!(debug.contains("auth.example.com"));
}
