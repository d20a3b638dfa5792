//! Interception Policy
//!
//! Compiled form of the configured rules. A policy is built once from an
//! [`AppConfig`] and never mutated; reloading builds a fresh policy and swaps
//! it into the [`PolicyStore`] wholesale.

use crate::config::{AppConfig, LanguagePackConfig, RuleConfig};
use crate::error::InterceptError;
use crate::filter::HostMatcher;
use crate::headers::AcceptLanguageInjector;
use crate::Result;
use regex::{Regex, RegexBuilder};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// Rule with its pattern compiled and host constraint normalised
#[derive(Debug, Clone)]
pub struct CompiledRule {
    pub name: String,
    pattern: Regex,
    host: Option<HostMatcher>,
    anchored: bool,
    pub remote_url: Option<String>,
    pub local_path: Option<PathBuf>,
    pub inline_fetch: bool,
    pub redirect_status: u16,
}

impl CompiledRule {
    /// Compile a rule. The pattern is always case-insensitive.
    pub fn compile(config: &RuleConfig) -> Result<Self> {
        if !(300..400).contains(&config.redirect_status) {
            return Err(InterceptError::RuleStatusInvalid {
                rule: config.display_name().to_string(),
                status: config.redirect_status,
            });
        }

        let pattern = RegexBuilder::new(&config.pattern)
            .case_insensitive(true)
            .build()
            .map_err(|e| InterceptError::RulePatternInvalid {
                rule: config.display_name().to_string(),
                reason: e.to_string(),
            })?;

        Ok(Self {
            name: config.display_name().to_string(),
            pattern,
            host: config.host.as_deref().map(HostMatcher::new),
            anchored: config.anchored,
            remote_url: config.remote_url.clone(),
            local_path: config.local_path.clone(),
            inline_fetch: config.inline_fetch,
            redirect_status: config.redirect_status,
        })
    }

    /// Check the host constraint first, then the path pattern.
    ///
    /// Anchored rules need a match starting at offset 0 but may stop before
    /// the end of the path. Leftmost-first search returns a match at offset 0
    /// whenever one exists, so checking the first match is enough.
    pub fn matches(&self, host: &str, path: &str) -> bool {
        if let Some(matcher) = &self.host {
            if !matcher.matches(host) {
                return false;
            }
        }

        match self.pattern.find(path) {
            Some(m) => !self.anchored || m.start() == 0,
            None => false,
        }
    }
}

/// Ordered rule list; the first matching rule wins.
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    rules: Vec<CompiledRule>,
}

impl RuleSet {
    /// Compile rules in order, dropping (and logging) any that fail to compile.
    pub fn compile(configs: &[RuleConfig]) -> Self {
        let rules = configs
            .iter()
            .filter_map(|config| match CompiledRule::compile(config) {
                Ok(rule) => Some(rule),
                Err(e) => {
                    warn!("{}. Rule skipped", e);
                    None
                }
            })
            .collect();

        Self { rules }
    }

    pub fn find(&self, host: &str, path: &str) -> Option<&CompiledRule> {
        let found = self.rules.iter().find(|rule| rule.matches(host, path));
        if let Some(rule) = found {
            debug!("Rule '{}' matched {}{}", rule.name, host, path);
        }
        found
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

/// Everything a request callback needs to decide what to do.
#[derive(Debug, Clone, Default)]
pub struct InterceptPolicy {
    pub rules: RuleSet,
    pub language_pack: LanguagePackConfig,
    pub injector: AcceptLanguageInjector,
}

impl InterceptPolicy {
    pub fn from_config(config: &AppConfig) -> Self {
        let configured = config.all_rules();
        let rules = RuleSet::compile(&configured);

        info!(
            loaded = rules.len(),
            skipped = configured.len() - rules.len(),
            "Compiled interception rules"
        );

        Self {
            rules,
            language_pack: config.language_pack.clone(),
            injector: AcceptLanguageInjector::from_config(config),
        }
    }
}

/// Shared handle to the active policy.
///
/// Readers take a cheap `Arc` snapshot, so a reload never blocks behind a
/// request that is still resolving.
#[derive(Debug, Clone)]
pub struct PolicyStore {
    current: Arc<RwLock<Arc<InterceptPolicy>>>,
    source: Option<PathBuf>,
}

impl PolicyStore {
    pub fn new(policy: InterceptPolicy, source: Option<PathBuf>) -> Self {
        Self {
            current: Arc::new(RwLock::new(Arc::new(policy))),
            source,
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(InterceptPolicy::from_config(config), config.source.clone())
    }

    pub async fn current(&self) -> Arc<InterceptPolicy> {
        self.current.read().await.clone()
    }

    /// Re-read the config file and swap in the new policy.
    ///
    /// On failure the active policy stays in place and the error is returned.
    /// Listener settings and the fetch client are not reloaded.
    pub async fn reload(&self) -> Result<usize> {
        let source = self.source.as_ref().ok_or_else(|| {
            InterceptError::Configuration("no configuration file to reload from".to_string())
        })?;

        let config = AppConfig::load(source)?;
        let policy = InterceptPolicy::from_config(&config);
        let count = policy.rules.len();

        *self.current.write().await = Arc::new(policy);
        info!("Reloaded {} interception rules from {}", count, source.display());
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn rule(pattern: &str) -> RuleConfig {
        RuleConfig::new(pattern)
    }

    #[test]
    fn test_first_match_wins() {
        let rules = RuleSet::compile(&[
            rule("^/assets/lang").with_remote_url("https://first"),
            rule("^/assets").with_remote_url("https://second"),
        ]);

        let found = rules.find("www.figma.com", "/assets/lang/en.json").unwrap();
        assert_eq!(found.remote_url.as_deref(), Some("https://first"));

        let found = rules.find("www.figma.com", "/assets/img.png").unwrap();
        assert_eq!(found.remote_url.as_deref(), Some("https://second"));
    }

    #[test]
    fn test_host_constraint_checked_before_pattern() {
        let rules = RuleSet::compile(&[
            rule("^/assets/lang.*").with_host("figma.com").with_remote_url("https://a"),
            rule("^/assets/lang.*").with_remote_url("https://b"),
        ]);

        let found = rules.find("www.figma.com", "/assets/lang/en.json").unwrap();
        assert_eq!(found.remote_url.as_deref(), Some("https://a"));

        let found = rules.find("evilfigma.com", "/assets/lang/en.json").unwrap();
        assert_eq!(found.remote_url.as_deref(), Some("https://b"));
    }

    #[test]
    fn test_case_insensitive_prefix_match() {
        let rules = RuleSet::compile(&[rule("/Assets/LANG")]);
        assert!(rules.find("figma.com", "/assets/lang/en.json?v=1").is_some());
        assert!(rules.find("figma.com", "/static/assets/lang").is_none());
    }

    #[test]
    fn test_unanchored_rules_search_anywhere() {
        let rules = RuleSet::compile(&[rule(r"\.min\.en\.json").with_anchored(false)]);
        assert!(rules
            .find("www.figma.com", "/webpack-artifacts/assets/figma_app-abc.min.en.json")
            .is_some());
        assert!(rules.find("www.figma.com", "/index.html").is_none());
    }

    #[test]
    fn test_invalid_pattern_is_dropped() {
        let rules = RuleSet::compile(&[rule("(unclosed"), rule("^/ok")]);
        assert_eq!(rules.len(), 1);
        assert!(rules.find("any.host", "(unclosed").is_none());
        assert!(rules.find("any.host", "/ok").is_some());
    }

    #[test]
    fn test_non_redirect_status_drops_only_that_rule() {
        let mut bad = rule("^/other");
        bad.redirect_status = 200;

        assert!(matches!(
            CompiledRule::compile(&bad),
            Err(InterceptError::RuleStatusInvalid { status: 200, .. })
        ));

        let rules = RuleSet::compile(&[rule("^/good").with_remote_url("https://cdn/zh.json"), bad]);
        assert_eq!(rules.len(), 1);
        assert!(rules.find("h", "/good").is_some());
        assert!(rules.find("h", "/other").is_none());
    }

    #[test]
    fn test_empty_rule_set_never_matches() {
        let rules = RuleSet::default();
        assert!(rules.is_empty());
        assert!(rules.find("www.figma.com", "/").is_none());
    }

    #[tokio::test]
    async fn test_reload_swaps_policy() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        fs::write(&path, "interception_rules:\n  - pattern: ^/a\n").unwrap();

        let config = AppConfig::load(&path).unwrap();
        let store = PolicyStore::from_config(&config);
        assert_eq!(store.current().await.rules.len(), 1);

        fs::write(
            &path,
            "interception_rules:\n  - pattern: ^/a\n  - pattern: ^/b\n",
        )
        .unwrap();
        assert_eq!(store.reload().await.unwrap(), 2);
        assert!(store.current().await.rules.find("h", "/b").is_some());
    }

    #[tokio::test]
    async fn test_failed_reload_keeps_current_policy() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        fs::write(&path, "interception_rules:\n  - pattern: ^/a\n").unwrap();

        let store = PolicyStore::from_config(&AppConfig::load(&path).unwrap());
        fs::write(&path, "interception_rules: {broken").unwrap();

        assert!(store.reload().await.is_err());
        assert_eq!(store.current().await.rules.len(), 1);
    }

    #[tokio::test]
    async fn test_reload_without_source_fails() {
        let store = PolicyStore::new(InterceptPolicy::default(), None);
        assert!(matches!(
            store.reload().await,
            Err(InterceptError::Configuration(_))
        ));
    }
}
