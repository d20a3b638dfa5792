//! Accept-Language forcing for the target application.

use crate::config::AppConfig;
use crate::filter::HostMatcher;
use hudsucker::hyper::header::{HeaderMap, HeaderValue, ACCEPT_LANGUAGE};
use tracing::debug;

/// Puts the configured locale at the head of the Accept-Language preference
/// list for requests to the target domain.
#[derive(Debug, Clone)]
pub struct AcceptLanguageInjector {
    enabled: bool,
    locale: String,
    target: HostMatcher,
}

impl Default for AcceptLanguageInjector {
    fn default() -> Self {
        Self {
            enabled: false,
            locale: "zh-CN".to_string(),
            target: HostMatcher::new("figma.com"),
        }
    }
}

impl AcceptLanguageInjector {
    /// An enabled injector for `locale` on `target_domain` and its subdomains.
    pub fn new(locale: &str, target_domain: &str) -> Self {
        Self {
            enabled: true,
            locale: locale.trim().to_string(),
            target: HostMatcher::new(target_domain),
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            enabled: config.force_lang && !config.locale.trim().is_empty(),
            ..Self::new(&config.locale, &config.target_domain)
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Leading preference entries, e.g. `zh-CN,zh;q=0.9`.
    fn preferred(&self) -> String {
        match self.locale.split_once('-') {
            Some((primary, _)) if !primary.is_empty() => {
                format!("{},{};q=0.9", self.locale, primary)
            }
            _ => self.locale.clone(),
        }
    }

    /// Header value used when the request carries none.
    pub fn default_value(&self) -> String {
        format!("{},en;q=0.8", self.preferred())
    }

    /// Whether the locale already appears as a language range in `value`.
    fn lists_locale(&self, value: &str) -> bool {
        value.split(',').any(|entry| {
            let range = entry.split(';').next().unwrap_or("").trim();
            range.eq_ignore_ascii_case(&self.locale)
        })
    }

    /// Compute the rewritten header value, or `None` if it should stay as is.
    pub fn rewrite(&self, existing: Option<&str>) -> Option<String> {
        match existing.map(str::trim) {
            None | Some("") => Some(self.default_value()),
            Some(value) if self.lists_locale(value) => None,
            Some(value) => Some(format!("{},{}", self.preferred(), value)),
        }
    }

    /// Apply to a request's headers. Returns true if the header changed.
    pub fn inject(&self, host: &str, headers: &mut HeaderMap) -> bool {
        if !self.enabled || !self.target.matches(host) {
            return false;
        }

        let existing = match headers.get(ACCEPT_LANGUAGE) {
            Some(value) => match value.to_str() {
                Ok(s) => Some(s.to_string()),
                Err(_) => {
                    debug!("Accept-Language on {} is not visible ASCII, left untouched", host);
                    return false;
                }
            },
            None => None,
        };

        let Some(updated) = self.rewrite(existing.as_deref()) else {
            return false;
        };

        match HeaderValue::from_str(&updated) {
            Ok(value) => {
                headers.insert(ACCEPT_LANGUAGE, value);
                debug!("Accept-Language for {} set to {}", host, updated);
                true
            }
            Err(e) => {
                debug!("Could not build Accept-Language value: {}", e);
                false
            }
        }
    }
}
