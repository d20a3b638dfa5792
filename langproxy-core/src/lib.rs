//! langproxy core library
//!
//! Rule-based interception of language pack requests on top of the
//! `hudsucker` MITM proxy: matching requests are answered from a local file,
//! an inline remote fetch or a redirect, and Accept-Language can be forced
//! for the target application.

pub mod admin;
pub mod ca;
pub mod filter;
pub mod handlers;
pub mod headers;
/// Proxy bootstrap
pub mod proxy;
pub mod resolver;

/// Configuration types and loading
pub mod config;

/// Compiled rules and the reloadable policy store
pub mod policy;

/// Error types for interception operations
pub mod error;

pub use admin::{InterceptStats, StatsSnapshot};
pub use ca::CertificateAuthority;
pub use config::{AppConfig, LanguagePackConfig, RuleConfig};
pub use error::InterceptError;
pub use filter::HostMatcher;
pub use handlers::InterceptHandler;
pub use headers::AcceptLanguageInjector;
pub use policy::{CompiledRule, InterceptPolicy, PolicyStore, RuleSet};
pub use proxy::ProxyServer;
pub use resolver::{Action, FetchedResource, HttpFetcher, RemoteFetcher, Resolver};

/// Result type alias for interception operations
pub type Result<T> = std::result::Result<T, InterceptError>;
