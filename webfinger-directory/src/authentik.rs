//! Client for the authentik `core/users` API.
use crate::Directory;
use crate::LookupError;
use crate::UserRecord;
use reqwest::header;
use reqwest::header::HeaderMap;
use reqwest::header::HeaderValue;
use serde::Deserialize;

/// One page of `GET /api/v3/core/users/`.
#[derive(Debug, Deserialize)]
struct UserList {
    results: Option<Vec<User>>,
}

#[derive(Debug, Deserialize)]
struct User {
    #[serde(default)]
    email: Option<String>,
    name: String,
    avatar: String,
}

fn first_user(list: UserList) -> Result<UserRecord, LookupError> {
    let users = list.results.ok_or(LookupError::MissingResults)?;
    let user = users.into_iter().next().ok_or(LookupError::NotFound)?;
    let email = match user.email {
        Some(email) if !email.is_empty() => email,
        _ => return Err(LookupError::MissingEmail),
    };
    Ok(UserRecord {
        email,
        name: user.name,
        avatar: user.avatar,
    })
}

#[cfg(test)]
fn parse(json: &str) -> Result<UserRecord, LookupError> {
    first_user(serde_json::from_str(json)?)
}

#[test]
fn test_first_user() {
    let json = r#"{
        "pagination": {"count": 2},
        "results": [
            {"pk": 1, "email": "a@example.com", "name": "A", "avatar": "https://a"},
            {"pk": 2, "email": "b@example.com", "name": "B", "avatar": "https://b"}
        ]
    }"#;
    let user = parse(json).unwrap();
    assert_eq!(user.email, "a@example.com");
    assert_eq!(user.name, "A");
    assert_eq!(user.avatar, "https://a");
}

#[test]
fn test_first_user_errors() {
    assert!(matches!(
        parse(r#"{"pagination": {}}"#),
        Err(LookupError::MissingResults)
    ));
    assert!(matches!(
        parse(r#"{"results": []}"#),
        Err(LookupError::NotFound)
    ));
    assert!(matches!(
        parse(r#"{"results": [{"email": "", "name": "A", "avatar": "x"}]}"#),
        Err(LookupError::MissingEmail)
    ));
    assert!(matches!(
        parse(r#"{"results": [{"name": "A", "avatar": "x"}]}"#),
        Err(LookupError::MissingEmail)
    ));
    assert!(matches!(parse("<html>"), Err(LookupError::Malformed(_))));
}

fn header_value(name: &'static str, value: &str) -> Result<HeaderValue, LookupError> {
    HeaderValue::from_str(value).map_err(|_| LookupError::InvalidHeader { name })
}

/// Directory backed by an authentik instance.
#[derive(Clone, Debug)]
pub struct AuthentikClient {
    client: reqwest::Client,
    host: String,
    api_base: String,
}

impl AuthentikClient {
    /// Create a client for the authentik instance at `host` (for example,
    /// "auth.example.com"), authenticating with an API `token`.
    pub fn new(host: &str, token: &str, user_agent: &str) -> Result<Self, LookupError> {
        let mut authorization = header_value("Authorization", &format!("Bearer {token}"))?;
        authorization.set_sensitive(true);
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, authorization);
        headers.insert(header::USER_AGENT, header_value("User-Agent", user_agent)?);
        headers.insert(header::ACCEPT, HeaderValue::from_static("application/json"));
        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()?;
        Ok(Self {
            client,
            host: host.to_string(),
            api_base: format!("https://{host}/api/v3"),
        })
    }
    /// Send API requests to `api_base` instead of `https://{host}/api/v3`.
    ///
    /// The host that is reported via [`Directory::host`] does not change.
    pub fn with_api_base(mut self, api_base: &str) -> Self {
        self.api_base = api_base.trim_end_matches('/').to_string();
        self
    }
}

#[async_trait::async_trait]
impl Directory for AuthentikClient {
    async fn lookup(&self, email: &str) -> Result<UserRecord, LookupError> {
        // authentik drops empty filters and would list every user.
        if email.is_empty() {
            return Err(LookupError::NotFound);
        }
        let url = format!("{}/core/users/", self.api_base);
        tracing::debug!("Looking up {email} via {url}");
        let query = [("email", email), ("page_size", "1"), ("is_active", "true")];
        let response = self.client.get(url).query(&query).send().await?;
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(LookupError::Status { status, body });
        }
        let list: UserList = serde_json::from_str(&body)?;
        first_user(list)
    }
    fn host(&self) -> &str {
        &self.host
    }
}

#[test]
fn test_invalid_header() {
    let client = AuthentikClient::new("auth.example.com", "token\n", "agent");
    assert!(matches!(
        client,
        Err(LookupError::InvalidHeader {
            name: "Authorization"
        })
    ));
}
