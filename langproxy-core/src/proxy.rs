use crate::{
    admin::{start_admin_server, AdminState, InterceptStats},
    ca::CertificateAuthority,
    config::AppConfig,
    error::InterceptError,
    handlers::InterceptHandler,
    policy::PolicyStore,
    resolver::{HttpFetcher, RemoteFetcher, Resolver},
    Result,
};
use hudsucker::{certificate_authority::RcgenAuthority, rustls, ProxyBuilder};
use std::future::Future;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use tracing::{error, info};

/// MITM proxy running the interception policy.
pub struct ProxyServer {
    config: AppConfig,
    ca: CertificateAuthority,
    store: PolicyStore,
    stats: Arc<InterceptStats>,
    fetcher: Option<Arc<dyn RemoteFetcher>>,
}

impl ProxyServer {
    pub fn new(config: AppConfig, ca: CertificateAuthority) -> Self {
        let store = PolicyStore::from_config(&config);
        Self {
            config,
            ca,
            store,
            stats: Arc::new(InterceptStats::default()),
            fetcher: None,
        }
    }

    /// Replace the reqwest fetcher (used by tests).
    pub fn with_fetcher(mut self, fetcher: Arc<dyn RemoteFetcher>) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    pub fn stats(&self) -> Arc<InterceptStats> {
        self.stats.clone()
    }

    pub fn store(&self) -> PolicyStore {
        self.store.clone()
    }

    /// Run until `shutdown` resolves.
    pub async fn run<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let ip: IpAddr = self.config.listen_address.parse().map_err(|e| {
            InterceptError::Configuration(format!(
                "Invalid listen address {}: {}",
                self.config.listen_address, e
            ))
        })?;
        let addr = SocketAddr::new(ip, self.config.listen_port);

        let rules = self.store.current().await.rules.len();
        self.stats.record_reload(rules);

        if let Some(admin_port) = self.config.admin_port {
            let state = AdminState {
                stats: self.stats.clone(),
                store: self.store.clone(),
            };
            tokio::spawn(async move {
                if let Err(e) = start_admin_server(admin_port, state).await {
                    error!("Admin server failed: {}", e);
                }
            });
        }

        // Hudsucker/Rustls expects DER, not PEM.
        let private_key = rustls::PrivateKey(self.ca.key_der());
        let ca_cert = rustls::Certificate(self.ca.cert_der()?);

        let authority = RcgenAuthority::new(private_key, ca_cert, 1000).map_err(|e| {
            InterceptError::Certificate(format!("Failed to create CA authority: {}", e))
        })?;

        let fetcher = match self.fetcher {
            Some(fetcher) => fetcher,
            None => Arc::new(HttpFetcher::from_config(&self.config)?),
        };
        let handler = InterceptHandler::new(self.store, Resolver::new(fetcher), self.stats.clone());

        info!("Starting langproxy on {} with {} rules", addr, rules);

        let proxy = ProxyBuilder::new()
            .with_addr(addr)
            .with_rustls_client()
            .with_ca(authority)
            .with_http_handler(handler)
            .build();

        proxy
            .start(shutdown)
            .await
            .map_err(|e| InterceptError::Network(format!("Proxy failed: {}", e)))?;

        info!("Proxy stopped. Stats: {:?}", self.stats.snapshot());
        Ok(())
    }
}
