//! Configuration types and utilities

use crate::error::InterceptError;
use crate::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{error, info, warn};

/// Proxy configuration, loaded once at startup and again on explicit reload.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Address to listen on
    pub listen_address: String,
    /// Port to listen on
    pub listen_port: u16,
    /// Admin API port (health/stats/reload). Disabled when unset.
    pub admin_port: Option<u16>,
    /// Upstream proxy for outbound fetches, any scheme reqwest understands
    pub upstream_proxy: Option<String>,
    /// Upstream HTTP proxy (used when `upstream_proxy` is unset)
    pub upstream_http: Option<String>,
    /// Upstream SOCKS5 proxy (used when neither of the above is set)
    pub upstream_socks5: Option<String>,
    /// Rewrite Accept-Language on requests to the target domain
    pub force_lang: bool,
    /// Locale forced by the Accept-Language injector
    pub locale: String,
    /// Domain (and subdomains) the Accept-Language injector applies to
    pub target_domain: String,
    /// Global language pack sources used when a rule names none
    pub language_pack: LanguagePackConfig,
    /// Single-rule shape kept for older config files
    pub interception_rule: Option<RuleConfig>,
    /// Ordered interception rules
    pub interception_rules: Vec<RuleConfig>,
    /// Legacy JSON rules file (`[{pattern, host?, redirect}]`)
    pub rules_file: Option<PathBuf>,
    /// Timeout for inline remote fetches
    pub fetch_timeout_secs: u64,
    /// Directory holding the MITM root CA
    pub ca_dir: PathBuf,
    /// File this configuration was read from
    #[serde(skip)]
    pub source: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            listen_address: "127.0.0.1".to_string(),
            listen_port: 8888,
            admin_port: None,
            upstream_proxy: None,
            upstream_http: None,
            upstream_socks5: None,
            force_lang: false,
            locale: "zh-CN".to_string(),
            target_domain: "figma.com".to_string(),
            language_pack: LanguagePackConfig::default(),
            interception_rule: None,
            interception_rules: Vec::new(),
            rules_file: None,
            fetch_timeout_secs: 6,
            ca_dir: PathBuf::from("./certs"),
            source: None,
        }
    }
}

/// Language pack sources
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LanguagePackConfig {
    /// Local file served in place of the original resource
    pub local_path: Option<PathBuf>,
    /// Remote file relayed inline, or redirected to as a last resort
    pub remote_url: Option<String>,
}

/// A single interception rule as written in the config file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RuleConfig {
    /// Name used in logs; defaults to the pattern
    #[serde(default)]
    pub name: Option<String>,
    /// Case-insensitive regex applied to the request path (with query)
    pub pattern: String,
    /// Host constraint, matching the host itself and its subdomains
    #[serde(default)]
    pub host: Option<String>,
    /// Remote source overriding `language_pack.remote_url`
    #[serde(default)]
    pub remote_url: Option<String>,
    /// Local source overriding `language_pack.local_path`
    #[serde(default)]
    pub local_path: Option<PathBuf>,
    /// Require the match to start at the beginning of the path
    #[serde(default = "default_true")]
    pub anchored: bool,
    /// Relay the remote resource in-process before falling back to a redirect
    #[serde(default = "default_true")]
    pub inline_fetch: bool,
    /// Status used when redirecting to the remote source
    #[serde(default = "default_redirect_status")]
    pub redirect_status: u16,
}

fn default_true() -> bool {
    true
}

fn default_redirect_status() -> u16 {
    302
}

impl RuleConfig {
    /// Create a rule with default options.
    pub fn new(pattern: impl Into<String>) -> Self {
        Self {
            name: None,
            pattern: pattern.into(),
            host: None,
            remote_url: None,
            local_path: None,
            anchored: true,
            inline_fetch: true,
            redirect_status: default_redirect_status(),
        }
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    pub fn with_remote_url(mut self, url: impl Into<String>) -> Self {
        self.remote_url = Some(url.into());
        self
    }

    pub fn with_local_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.local_path = Some(path.into());
        self
    }

    pub fn with_anchored(mut self, anchored: bool) -> Self {
        self.anchored = anchored;
        self
    }

    /// Name used in logs.
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.pattern)
    }
}

/// Entry of the legacy redirect rules file.
#[derive(Debug, Clone, Deserialize)]
pub struct LegacyRule {
    pub pattern: String,
    #[serde(default)]
    pub host: Option<String>,
    pub redirect: String,
}

impl From<LegacyRule> for RuleConfig {
    /// Legacy rules always redirected, so inline fetching stays off and the
    /// original 307 status is kept.
    fn from(legacy: LegacyRule) -> Self {
        Self {
            name: None,
            pattern: legacy.pattern,
            host: legacy.host,
            remote_url: Some(legacy.redirect),
            local_path: None,
            anchored: true,
            inline_fetch: false,
            redirect_status: 307,
        }
    }
}

impl AppConfig {
    /// Load configuration from a YAML or JSON file (chosen by extension).
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(InterceptError::ConfigNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        let mut config = Self::parse(path, &content)?;
        config.source = Some(path.to_path_buf());
        config.validate()?;

        info!(
            path = %path.display(),
            rules = config.interception_rules.len() + config.interception_rule.is_some() as usize,
            force_lang = config.force_lang,
            "Loaded configuration"
        );
        Ok(config)
    }

    /// Load configuration, falling back to defaults (no interception) on any error.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                error!("{}. Continuing with default configuration and no rules", e);
                Self {
                    source: Some(path.to_path_buf()),
                    ..Self::default()
                }
            }
        }
    }

    fn parse(path: &Path, content: &str) -> Result<Self> {
        let is_json = path.extension().is_some_and(|e| e == "json");
        let parsed = if is_json {
            serde_json::from_str(content).map_err(|e| e.to_string())
        } else {
            serde_yaml::from_str::<Option<Self>>(content)
                .map(Option::unwrap_or_default)
                .map_err(|e| e.to_string())
        };

        parsed.map_err(|reason| InterceptError::ConfigParse {
            path: path.to_path_buf(),
            reason,
        })
    }

    /// Check global values that deserialize fine but make no sense.
    ///
    /// Per-rule problems are not errors here; the policy skips those rules.
    pub fn validate(&self) -> Result<()> {
        if self.fetch_timeout_secs == 0 {
            return Err(InterceptError::Configuration(
                "fetch_timeout_secs must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// All rules in evaluation order: single rule, rule list, then the legacy file.
    ///
    /// A missing or broken legacy file is logged and contributes no rules.
    pub fn all_rules(&self) -> Vec<RuleConfig> {
        let mut rules: Vec<RuleConfig> = self
            .interception_rule
            .iter()
            .chain(&self.interception_rules)
            .cloned()
            .collect();

        if let Some(rules_file) = &self.rules_file {
            let path = self.resolve_relative(rules_file);
            match load_legacy_rules(&path) {
                Ok(legacy) => rules.extend(legacy),
                Err(e) => warn!("Skipping legacy rules: {}", e),
            }
        }

        rules
    }

    /// Upstream proxy URL for outbound fetches, if any.
    pub fn upstream(&self) -> Option<String> {
        if let Some(proxy) = self.upstream_proxy.as_ref().or(self.upstream_http.as_ref()) {
            return Some(proxy.clone());
        }
        self.upstream_socks5.as_ref().map(|socks| {
            if socks.contains("://") {
                socks.clone()
            } else {
                format!("socks5://{}", socks)
            }
        })
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    /// Resolve a path relative to the directory of the config file.
    fn resolve_relative(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            return path.to_path_buf();
        }
        match self.source.as_deref().and_then(Path::parent) {
            Some(dir) => dir.join(path),
            None => path.to_path_buf(),
        }
    }
}

/// Read the legacy JSON rules file.
pub fn load_legacy_rules(path: &Path) -> Result<Vec<RuleConfig>> {
    if !path.exists() {
        return Err(InterceptError::ConfigNotFound(path.to_path_buf()));
    }
    let content = fs::read_to_string(path)?;
    let raw: Vec<LegacyRule> =
        serde_json::from_str(&content).map_err(|e| InterceptError::ConfigParse {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

    info!("Loaded {} legacy redirect rules from {}", raw.len(), path.display());
    Ok(raw.into_iter().map(RuleConfig::from).collect())
}
