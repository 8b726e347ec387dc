//! WebFinger (RFC 7033) for accounts in the directory.
//!
//! Verify responses via <https://webfinger.net/>.
use crate::serve::ServerContext;
use crate::serve::content_type;
use crate::serve::internal_server_error;
use crate::serve::response;
use axum::Router;
use axum::body::Body;
use axum::extract::RawQuery;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::http::HeaderValue;
use axum::http::Response;
use axum::http::StatusCode;
use axum::routing::get;
use serde::Deserialize;
use serde::Serialize;
use std::collections::BTreeMap;
use webfinger_directory::UserRecord;

pub const NAME_PROPERTY: &str = "http://webfinger.example/ns/name";
pub const ISSUER_REL: &str = "http://openid.net/specs/connect/1.0/issuer";
pub const AVATAR_REL: &str = "http://webfinger.net/rel/avatar";
const ACCT: &str = "acct:";

/// JSON Resource Descriptor.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebFingerResource {
    pub subject: String,
    pub aliases: Vec<String>,
    pub properties: BTreeMap<String, String>,
    pub links: Vec<Link>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub rel: String,
    pub href: String,
}

/// OpenID Connect issuer of the application `application` at `host`.
pub fn issuer_url(host: &str, application: &str) -> String {
    format!("https://{host}/application/o/{application}/")
}

impl WebFingerResource {
    pub fn new(user: &UserRecord, host: &str, application: &str) -> Self {
        let properties = BTreeMap::from([(NAME_PROPERTY.to_string(), user.name.clone())]);
        Self {
            subject: format!("{ACCT}{}", user.email),
            aliases: Vec::new(),
            properties,
            links: vec![
                Link {
                    rel: ISSUER_REL.to_string(),
                    href: issuer_url(host, application),
                },
                Link {
                    rel: AVATAR_REL.to_string(),
                    href: user.avatar.clone(),
                },
            ],
        }
    }
}

#[test]
fn test_resource_json() {
    let user = UserRecord {
        email: "alice@example.com".to_string(),
        name: "Alice A".to_string(),
        avatar: "https://cdn/x.png".to_string(),
    };
    let resource = WebFingerResource::new(&user, "auth.example.com", "tailscale");
    let expected = serde_json::json!({
        "subject": "acct:alice@example.com",
        "aliases": [],
        "properties": {
            "http://webfinger.example/ns/name": "Alice A",
        },
        "links": [
            {
                "rel": "http://openid.net/specs/connect/1.0/issuer",
                "href": "https://auth.example.com/application/o/tailscale/",
            },
            {
                "rel": "http://webfinger.net/rel/avatar",
                "href": "https://cdn/x.png",
            },
        ],
    });
    assert_eq!(serde_json::to_value(&resource).unwrap(), expected);
}

/// Why a `resource` parameter was rejected.
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum BadResource {
    #[error("resource not found in query")]
    Missing,
    #[error("resource does not have acct: prefix")]
    NotAcct,
}

/// The first `resource` parameter in `query`.
///
/// A query that cannot be decoded is treated as not having the parameter.
pub fn resource_param(query: Option<&str>) -> Option<String> {
    let pairs: Vec<(String, String)> = serde_urlencoded::from_str(query?).ok()?;
    pairs
        .into_iter()
        .find(|(key, _)| key == "resource")
        .map(|(_, value)| value)
}

#[test]
fn test_resource_param() {
    let param = |query| resource_param(Some(query));
    assert_eq!(param("resource=acct:a@b.c"), Some("acct:a@b.c".to_string()));
    assert_eq!(
        param("resource=acct%3Aa%40b.c&rel=x"),
        Some("acct:a@b.c".to_string())
    );
    assert_eq!(param("resource=acct:1&resource=acct:2"), Some("acct:1".to_string()));
    assert_eq!(param("resource="), Some("".to_string()));
    assert_eq!(param("resource"), Some("".to_string()));
    assert_eq!(param("rel=x"), None);
    assert_eq!(resource_param(None), None);
}

/// The account that `resource` refers to.
///
/// The account is everything after the first `acct:`, so `acct:acct:a@b.c`
/// gives `acct:a@b.c`.
pub fn account(resource: Option<&str>) -> Result<&str, BadResource> {
    let resource = resource.ok_or(BadResource::Missing)?;
    if !resource.starts_with(ACCT) {
        return Err(BadResource::NotAcct);
    }
    match resource.split_once(ACCT) {
        Some((_, account)) => Ok(account),
        None => Err(BadResource::NotAcct),
    }
}

#[test]
fn test_account() {
    assert_eq!(account(Some("acct:a@b.c")), Ok("a@b.c"));
    assert_eq!(account(Some("acct:acct:a@b.c")), Ok("acct:a@b.c"));
    assert_eq!(account(Some("acct:")), Ok(""));
    assert_eq!(account(Some("mailto:a@b.c")), Err(BadResource::NotAcct));
    assert_eq!(account(Some("ACCT:a@b.c")), Err(BadResource::NotAcct));
    assert_eq!(account(Some("")), Err(BadResource::NotAcct));
    assert_eq!(account(None), Err(BadResource::Missing));
}

async fn get_webfinger(
    State(ctx): State<ServerContext>,
    RawQuery(query): RawQuery,
) -> Response<Body> {
    let resource = resource_param(query.as_deref());
    let account = match account(resource.as_deref()) {
        Ok(account) => account,
        Err(err) => {
            let mut headers = HeaderMap::new();
            content_type(&mut headers, "text/plain; charset=utf-8");
            return response(StatusCode::BAD_REQUEST, headers, err.to_string());
        }
    };
    let user = match ctx.directory.lookup(account).await {
        Ok(user) => user,
        Err(err) => {
            tracing::error!("Error when trying to fetch webfinger data for {account}: {err}");
            return internal_server_error();
        }
    };
    let host = ctx.directory.host();
    let jrd = WebFingerResource::new(&user, host, &ctx.config.authentik_application);
    let body = match serde_json::to_string(&jrd) {
        Ok(body) => body,
        Err(err) => {
            tracing::error!("Could not serialize webfinger: {err}");
            return internal_server_error();
        }
    };
    let mut headers = HeaderMap::new();
    content_type(&mut headers, "application/jrd+json");
    headers.insert("Access-Control-Allow-Origin", HeaderValue::from_static("*"));
    response(StatusCode::OK, headers, body)
}

pub fn routes(router: &Router<ServerContext>) -> Router<ServerContext> {
    router
        .clone()
        .route("/.well-known/webfinger", get(get_webfinger))
}
