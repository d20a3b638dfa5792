//! langproxy agent
//!
//! Standalone executable that runs the language pack interception proxy on
//! the user's machine. Loads the configuration, applies command line
//! overrides and hands everything to `langproxy_core::ProxyServer`.

use anyhow::{Context, Result};
use clap::Parser;
use langproxy_core::{AppConfig, CertificateAuthority, ProxyServer};
use std::future::Future;
use std::path::PathBuf;

pub mod logging;

/// Annotated sample configuration printed by `--example-config`.
pub const EXAMPLE_CONFIG: &str = r#"# langproxy configuration
listen_address: 127.0.0.1
listen_port: 8888
# admin_port: 8889

# Outbound proxy used for inline fetches
# upstream_proxy: http://127.0.0.1:7890
# upstream_socks5: 127.0.0.1:1080

force_lang: true
locale: zh-CN
target_domain: figma.com

language_pack:
  local_path: ./lang/zh.json
  remote_url: https://cdn.example.com/figma/zh.json

interception_rules:
  - name: figma-lang
    pattern: ^/webpack-artifacts/assets/figma_app_beta-[a-f0-9]+\.min\.en\.json
    host: figma.com
    # Per-rule sources take precedence over language_pack
    # local_path: ./lang/zh.json
    # remote_url: https://cdn.example.com/figma/zh.json

# Older redirect-only rules: [{"pattern": "...", "host": "...", "redirect": "..."}]
# rules_file: rules.json

fetch_timeout_secs: 6
ca_dir: ./certs
"#;

#[derive(Parser, Debug, Clone, Default)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Configuration file (YAML, or JSON by extension)
    #[arg(short, long, env = "LANGPROXY_CONFIG", default_value = "config.yaml")]
    pub config: PathBuf,

    /// Address to listen on, overrides the config file
    #[arg(long)]
    pub listen_addr: Option<String>,

    /// Port to listen on, overrides the config file
    #[arg(long)]
    pub listen_port: Option<u16>,

    /// Port to expose the Admin API (health/stats/reload)
    #[arg(long)]
    pub admin_port: Option<u16>,

    /// Directory holding the root CA, overrides the config file
    #[arg(long)]
    pub ca_dir: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error). RUST_LOG takes precedence.
    #[arg(long, env = "LANGPROXY_LOG", default_value = "info")]
    pub log_level: String,

    /// Emit logs as JSON lines
    #[arg(long)]
    pub json_logs: bool,

    /// Check the configuration and exit
    #[arg(long)]
    pub validate: bool,

    /// Print a sample configuration and exit
    #[arg(long)]
    pub example_config: bool,
}

/// Build the effective configuration: file values, then command line overrides.
///
/// A missing or broken config file leaves the proxy running with defaults
/// and no rules, so the browser keeps working.
pub fn load_config(args: &Args) -> AppConfig {
    let mut config = AppConfig::load_or_default(&args.config);
    apply_overrides(&mut config, args);
    config
}

fn apply_overrides(config: &mut AppConfig, args: &Args) {
    if let Some(addr) = &args.listen_addr {
        config.listen_address = addr.clone();
    }
    if let Some(port) = args.listen_port {
        config.listen_port = port;
    }
    if let Some(port) = args.admin_port {
        config.admin_port = Some(port);
    }
    if let Some(dir) = &args.ca_dir {
        config.ca_dir = dir.clone();
    }
}

/// Strict load used by `--validate`. Returns a one-line summary.
pub fn validate_config(args: &Args) -> Result<String> {
    let mut config = AppConfig::load(&args.config)
        .with_context(|| format!("Invalid configuration {}", args.config.display()))?;
    apply_overrides(&mut config, args);

    let policy = langproxy_core::InterceptPolicy::from_config(&config);
    let configured = config.all_rules().len();
    if policy.rules.len() != configured {
        anyhow::bail!(
            "{} of {} rules are invalid and would be skipped",
            configured - policy.rules.len(),
            configured
        );
    }

    Ok(format!(
        "{}: {} rules, listening on {}:{}, force_lang={}",
        args.config.display(),
        policy.rules.len(),
        config.listen_address,
        config.listen_port,
        config.force_lang
    ))
}

/// Run the proxy until `shutdown` resolves.
pub async fn run_agent<F>(args: Args, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let config = load_config(&args);

    tracing::info!("Starting langproxy agent...");
    tracing::info!("  Listen: {}:{}", config.listen_address, config.listen_port);
    if let Some(admin_port) = config.admin_port {
        tracing::info!("  Admin:  127.0.0.1:{}", admin_port);
    }
    if let Some(upstream) = config.upstream() {
        tracing::info!("  Upstream for inline fetches: {}", upstream);
    }

    let ca = CertificateAuthority::load_or_generate(&config.ca_dir)
        .context("Failed to initialize root CA")?;
    tracing::info!("Trust {} in your browser", ca.cert_path().display());

    ProxyServer::new(config, ca)
        .run(shutdown)
        .await
        .context("Proxy server failed")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn args_for(config: PathBuf) -> Args {
        Args {
            config,
            log_level: "info".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_example_config_parses() {
        let config: AppConfig = serde_yaml::from_str(EXAMPLE_CONFIG).unwrap();
        assert!(config.force_lang);
        assert_eq!(config.interception_rules.len(), 1);
        assert_eq!(config.listen_port, 8888);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_missing_config_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config(&args_for(dir.path().join("absent.yaml")));
        assert!(config.all_rules().is_empty());
        assert_eq!(config.listen_port, 8888);
    }

    #[test]
    fn test_cli_overrides_file_values() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(file, "listen_port: 9000\nadmin_port: 9001\nca_dir: /tmp/ca").unwrap();

        let mut args = args_for(file.path().to_path_buf());
        let config = load_config(&args);
        assert_eq!(config.listen_port, 9000);
        assert_eq!(config.admin_port, Some(9001));

        args.listen_port = Some(9100);
        args.listen_addr = Some("0.0.0.0".to_string());
        args.ca_dir = Some(PathBuf::from("./other"));
        let config = load_config(&args);
        assert_eq!(config.listen_port, 9100);
        assert_eq!(config.listen_address, "0.0.0.0");
        assert_eq!(config.ca_dir, PathBuf::from("./other"));
        assert_eq!(config.admin_port, Some(9001));
    }

    #[test]
    fn test_validate_reports_bad_patterns() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(file, "interception_rules:\n  - pattern: \"(\"\n  - pattern: ^/ok").unwrap();
        let err = validate_config(&args_for(file.path().to_path_buf())).unwrap_err();
        assert!(err.to_string().contains("1 of 2"));
    }

    #[test]
    fn test_validate_summary() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(file, "force_lang: true\ninterception_rules:\n  - pattern: ^/ok").unwrap();
        let summary = validate_config(&args_for(file.path().to_path_buf())).unwrap();
        assert!(summary.contains("1 rules"));
        assert!(summary.contains("force_lang=true"));
    }

    #[test]
    fn test_validate_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        assert!(validate_config(&args_for(dir.path().join("absent.yaml"))).is_err());
    }
}
