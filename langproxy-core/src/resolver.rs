//! Response resolution for matched requests.
//!
//! Sources are tried in a fixed order: local file, inline remote fetch,
//! redirect to the remote URL, and finally no action at all. Every failure
//! along the way is logged and falls through to the next step, so a
//! misconfigured rule can only ever cause a request to pass through.

use crate::config::{AppConfig, LanguagePackConfig};
use crate::error::InterceptError;
use crate::policy::CompiledRule;
use crate::Result;
use async_trait::async_trait;
use hudsucker::hyper::header::{
    HeaderValue, ACCESS_CONTROL_ALLOW_ORIGIN, CACHE_CONTROL, CONTENT_LENGTH, CONTENT_TYPE,
    EXPIRES, LOCATION, PRAGMA,
};
use hudsucker::hyper::{Body, Response, StatusCode};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

pub const JSON_CONTENT_TYPE: &str = "application/json; charset=utf-8";
const NO_CACHE: &str = "no-store, no-cache, must-revalidate";
const NO_CACHE_REDIRECT: &str = "no-store, no-cache, must-revalidate, proxy-revalidate";

/// What to do with a matched request
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Serve a file from disk
    ServeLocal { path: PathBuf, body: Vec<u8> },
    /// Serve a remote resource fetched by the proxy itself
    ServeRemoteInline {
        url: String,
        body: Vec<u8>,
        content_type: String,
    },
    /// Redirect the client to the remote resource
    RedirectRemote { url: String, status: u16 },
    /// Let the request through unchanged
    NoAction,
}

impl Action {
    /// Short label for logs and stats
    pub fn kind(&self) -> &'static str {
        match self {
            Action::ServeLocal { .. } => "serve_local",
            Action::ServeRemoteInline { .. } => "serve_remote_inline",
            Action::RedirectRemote { .. } => "redirect_remote",
            Action::NoAction => "no_action",
        }
    }

    /// Build the synthesized response. `None` means pass the request through.
    pub fn into_response(self) -> Option<Response<Body>> {
        let built = match self {
            Action::NoAction => return None,
            Action::ServeLocal { body, .. } => json_response(body, JSON_CONTENT_TYPE),
            Action::ServeRemoteInline {
                body, content_type, ..
            } => json_response(body, &content_type),
            Action::RedirectRemote { url, status } => Response::builder()
                .status(StatusCode::from_u16(status).unwrap_or(StatusCode::FOUND))
                .header(LOCATION, url)
                .header(CACHE_CONTROL, NO_CACHE_REDIRECT)
                .header(CONTENT_LENGTH, "0")
                .body(Body::empty()),
        };

        match built {
            Ok(response) => Some(response),
            Err(e) => {
                warn!("Failed to build response, passing request through: {}", e);
                None
            }
        }
    }
}

fn json_response(
    body: Vec<u8>,
    content_type: &str,
) -> std::result::Result<Response<Body>, hudsucker::hyper::http::Error> {
    let content_type = HeaderValue::from_str(content_type)
        .unwrap_or_else(|_| HeaderValue::from_static(JSON_CONTENT_TYPE));

    Response::builder()
        .status(StatusCode::OK)
        .header(CONTENT_TYPE, content_type)
        .header(CACHE_CONTROL, NO_CACHE)
        .header(PRAGMA, "no-cache")
        .header(EXPIRES, "0")
        .header(ACCESS_CONTROL_ALLOW_ORIGIN, "*")
        .header(CONTENT_LENGTH, body.len())
        .body(Body::from(body))
}

/// Result of an outbound fetch, whatever its status
#[derive(Debug, Clone)]
pub struct FetchedResource {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

/// Outbound fetch used for inline relaying.
#[async_trait]
pub trait RemoteFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<FetchedResource>;
}

/// reqwest-backed fetcher with a bounded timeout and optional upstream proxy.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(timeout: Duration, upstream: Option<&str>) -> Result<Self> {
        let mut builder = reqwest::Client::builder().timeout(timeout);

        if let Some(upstream) = upstream {
            let proxy = reqwest::Proxy::all(upstream).map_err(|e| {
                InterceptError::Configuration(format!("Invalid upstream proxy {}: {}", upstream, e))
            })?;
            builder = builder.proxy(proxy);
        }

        let client = builder.build().map_err(|e| {
            InterceptError::Configuration(format!("Failed to build HTTP client: {}", e))
        })?;

        Ok(Self { client })
    }

    pub fn from_config(config: &AppConfig) -> Result<Self> {
        Self::new(config.fetch_timeout(), config.upstream().as_deref())
    }
}

#[async_trait]
impl RemoteFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedResource> {
        let failed = |e: reqwest::Error| InterceptError::RemoteFetchFailed {
            url: url.to_string(),
            reason: e.to_string(),
        };

        let response = self.client.get(url).send().await.map_err(failed)?;
        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = response.bytes().await.map_err(failed)?.to_vec();

        Ok(FetchedResource {
            status,
            content_type,
            body,
        })
    }
}

/// Picks the action for a matched rule.
#[derive(Clone)]
pub struct Resolver {
    fetcher: Arc<dyn RemoteFetcher>,
}

impl Resolver {
    pub fn new(fetcher: Arc<dyn RemoteFetcher>) -> Self {
        Self { fetcher }
    }

    pub async fn resolve(&self, rule: &CompiledRule, pack: &LanguagePackConfig) -> Action {
        let local_path = rule.local_path.as_ref().or(pack.local_path.as_ref());
        let remote_url = rule.remote_url.as_ref().or(pack.remote_url.as_ref());

        if let Some(path) = local_path {
            match read_local(path).await {
                Ok(body) => {
                    info!("Serving local file {} for rule '{}'", path.display(), rule.name);
                    return Action::ServeLocal {
                        path: path.clone(),
                        body,
                    };
                }
                Err(e) => debug!("{}", e),
            }
        }

        let Some(url) = remote_url else {
            warn!(
                "Rule '{}' matched but no valid local file or remote URL is configured",
                rule.name
            );
            return Action::NoAction;
        };

        if rule.inline_fetch {
            match self.fetch_inline(url).await {
                Ok((body, content_type)) => {
                    info!("Relaying {} inline ({} bytes) for rule '{}'", url, body.len(), rule.name);
                    return Action::ServeRemoteInline {
                        url: url.clone(),
                        body,
                        content_type,
                    };
                }
                Err(e) => warn!("{}. Falling back to redirect", e),
            }
        }

        info!("Redirecting to {} for rule '{}'", url, rule.name);
        Action::RedirectRemote {
            url: url.clone(),
            status: rule.redirect_status,
        }
    }

    async fn fetch_inline(&self, url: &str) -> Result<(Vec<u8>, String)> {
        let fetched = self.fetcher.fetch(url).await?;

        if fetched.status != 200 {
            return Err(InterceptError::RemoteFetchFailed {
                url: url.to_string(),
                reason: format!("status {}", fetched.status),
            });
        }
        if fetched.body.is_empty() {
            return Err(InterceptError::RemoteFetchFailed {
                url: url.to_string(),
                reason: "empty body".to_string(),
            });
        }

        let content_type = fetched
            .content_type
            .unwrap_or_else(|| JSON_CONTENT_TYPE.to_string());
        Ok((fetched.body, content_type))
    }
}

async fn read_local(path: &Path) -> Result<Vec<u8>> {
    let missing = || InterceptError::LocalFileMissing(path.to_path_buf());

    let metadata = tokio::fs::metadata(path).await.map_err(|_| missing())?;
    if !metadata.is_file() {
        return Err(missing());
    }
    tokio::fs::read(path).await.map_err(|_| missing())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RuleConfig;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::tempdir;

    /// Fetcher returning a canned result and counting calls
    struct StubFetcher {
        result: Option<FetchedResource>,
        calls: AtomicUsize,
    }

    impl StubFetcher {
        fn ok(status: u16, body: &str, content_type: Option<&str>) -> Arc<Self> {
            Arc::new(Self {
                result: Some(FetchedResource {
                    status,
                    content_type: content_type.map(str::to_string),
                    body: body.as_bytes().to_vec(),
                }),
                calls: AtomicUsize::new(0),
            })
        }

        fn unreachable() -> Arc<Self> {
            Arc::new(Self {
                result: None,
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl RemoteFetcher for StubFetcher {
        async fn fetch(&self, url: &str) -> Result<FetchedResource> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.result
                .clone()
                .ok_or_else(|| InterceptError::RemoteFetchFailed {
                    url: url.to_string(),
                    reason: "connection refused".to_string(),
                })
        }
    }

    fn compile(config: RuleConfig) -> CompiledRule {
        CompiledRule::compile(&config).unwrap()
    }

    fn lang_rule() -> RuleConfig {
        RuleConfig::new("^/assets/lang.*")
            .with_host("figma.com")
            .with_remote_url("https://cdn/en.json")
    }

    #[tokio::test]
    async fn test_local_file_beats_remote() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("zh.json");
        std::fs::write(&path, r#"{"hello":"你好"}"#).unwrap();

        let fetcher = StubFetcher::ok(200, "{}", None);
        let resolver = Resolver::new(fetcher.clone());
        let rule = compile(lang_rule().with_local_path(&path));

        let action = resolver.resolve(&rule, &LanguagePackConfig::default()).await;
        assert!(matches!(action, Action::ServeLocal { ref body, .. } if body == r#"{"hello":"你好"}"#.as_bytes()));
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_global_local_path_fallback() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("zh.json");
        std::fs::write(&path, "{}").unwrap();

        let resolver = Resolver::new(StubFetcher::unreachable());
        let pack = LanguagePackConfig {
            local_path: Some(path.clone()),
            remote_url: None,
        };
        let action = resolver.resolve(&compile(RuleConfig::new("^/")), &pack).await;
        assert_eq!(action.kind(), "serve_local");
    }

    #[tokio::test]
    async fn test_missing_local_file_falls_through_to_inline() {
        let dir = tempdir().unwrap();
        let resolver = Resolver::new(StubFetcher::ok(200, r#"{"a":"b"}"#, Some("application/json")));
        let rule = compile(lang_rule().with_local_path(dir.path().join("absent.json")));

        match resolver.resolve(&rule, &LanguagePackConfig::default()).await {
            Action::ServeRemoteInline {
                url,
                body,
                content_type,
            } => {
                assert_eq!(url, "https://cdn/en.json");
                assert_eq!(body, br#"{"a":"b"}"#);
                assert_eq!(content_type, "application/json");
            }
            other => panic!("unexpected action {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_directory_is_not_a_local_file() {
        let dir = tempdir().unwrap();
        let resolver = Resolver::new(StubFetcher::unreachable());
        let rule = compile(RuleConfig::new("^/").with_local_path(dir.path()));

        let action = resolver.resolve(&rule, &LanguagePackConfig::default()).await;
        assert_eq!(action, Action::NoAction);
    }

    #[tokio::test]
    async fn test_inline_defaults_content_type() {
        let resolver = Resolver::new(StubFetcher::ok(200, "{}", None));
        let action = resolver
            .resolve(&compile(lang_rule()), &LanguagePackConfig::default())
            .await;
        assert!(
            matches!(action, Action::ServeRemoteInline { ref content_type, .. } if content_type == JSON_CONTENT_TYPE)
        );
    }

    #[tokio::test]
    async fn test_unreachable_remote_redirects() {
        let resolver = Resolver::new(StubFetcher::unreachable());
        let action = resolver
            .resolve(&compile(lang_rule()), &LanguagePackConfig::default())
            .await;
        assert_eq!(
            action,
            Action::RedirectRemote {
                url: "https://cdn/en.json".to_string(),
                status: 302
            }
        );
    }

    #[tokio::test]
    async fn test_non_200_or_empty_remote_redirects() {
        for fetcher in [StubFetcher::ok(404, "nope", None), StubFetcher::ok(200, "", None)] {
            let resolver = Resolver::new(fetcher);
            let action = resolver
                .resolve(&compile(lang_rule()), &LanguagePackConfig::default())
                .await;
            assert_eq!(action.kind(), "redirect_remote");
        }
    }

    #[tokio::test]
    async fn test_inline_fetch_disabled_skips_fetch() {
        let fetcher = StubFetcher::ok(200, "{}", None);
        let resolver = Resolver::new(fetcher.clone());
        let mut config = lang_rule();
        config.inline_fetch = false;
        config.redirect_status = 307;

        let action = resolver
            .resolve(&compile(config), &LanguagePackConfig::default())
            .await;
        assert_eq!(
            action,
            Action::RedirectRemote {
                url: "https://cdn/en.json".to_string(),
                status: 307
            }
        );
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_global_remote_fallback_and_no_source() {
        let resolver = Resolver::new(StubFetcher::unreachable());
        let rule = compile(RuleConfig::new("^/"));

        let action = resolver.resolve(&rule, &LanguagePackConfig::default()).await;
        assert_eq!(action, Action::NoAction);

        let pack = LanguagePackConfig {
            local_path: None,
            remote_url: Some("https://global/zh.json".to_string()),
        };
        let action = resolver.resolve(&rule, &pack).await;
        assert!(matches!(action, Action::RedirectRemote { ref url, .. } if url == "https://global/zh.json"));
    }

    #[test]
    fn test_local_response_headers() {
        let response = Action::ServeLocal {
            path: PathBuf::from("zh.json"),
            body: b"{}".to_vec(),
        }
        .into_response()
        .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let headers = response.headers();
        assert_eq!(headers[CONTENT_TYPE], JSON_CONTENT_TYPE);
        assert_eq!(headers[CACHE_CONTROL], NO_CACHE);
        assert_eq!(headers[PRAGMA], "no-cache");
        assert_eq!(headers[EXPIRES], "0");
        assert_eq!(headers[CONTENT_LENGTH], "2");
    }

    #[test]
    fn test_redirect_response() {
        let response = Action::RedirectRemote {
            url: "https://cdn/en.json".to_string(),
            status: 302,
        }
        .into_response()
        .unwrap();

        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(response.headers()[LOCATION], "https://cdn/en.json");
        assert_eq!(response.headers()[CACHE_CONTROL], NO_CACHE_REDIRECT);
    }

    #[test]
    fn test_invalid_location_passes_through() {
        let action = Action::RedirectRemote {
            url: "https://cdn/\nen.json".to_string(),
            status: 302,
        };
        assert!(action.into_response().is_none());
        assert!(Action::NoAction.into_response().is_none());
    }
}
