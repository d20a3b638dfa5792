use crate::admin::InterceptStats;
use crate::filter::strip_port;
use crate::policy::PolicyStore;
use crate::resolver::Resolver;
use hudsucker::{
    hyper::{header::HOST, Body, Method, Request},
    HttpContext, HttpHandler, RequestOrResponse,
};
use std::sync::{atomic::Ordering, Arc};
use tracing::{debug, info};
use uuid::Uuid;

/// hudsucker callback that applies the interception policy to each request.
///
/// Responses from upstream are never touched; everything happens before the
/// request leaves the proxy.
#[derive(Clone)]
pub struct InterceptHandler {
    store: PolicyStore,
    resolver: Resolver,
    stats: Arc<InterceptStats>,
}

impl InterceptHandler {
    pub fn new(store: PolicyStore, resolver: Resolver, stats: Arc<InterceptStats>) -> Self {
        Self {
            store,
            resolver,
            stats,
        }
    }

    pub fn stats(&self) -> Arc<InterceptStats> {
        self.stats.clone()
    }

    /// Run the policy against one request.
    ///
    /// Returns the request (possibly with a rewritten Accept-Language header)
    /// to let it through, or a synthesized response to short-circuit it.
    pub async fn intercept(&self, req: Request<Body>) -> RequestOrResponse {
        let mut req = req;
        self.stats.total_requests.fetch_add(1, Ordering::Relaxed);

        // Tunnel setup; the decrypted requests inside it come through here again.
        if req.method() == Method::CONNECT {
            return RequestOrResponse::Request(req);
        }

        let Some(host) = request_host(&req) else {
            debug!("Request without host passed through: {}", req.uri());
            return RequestOrResponse::Request(req);
        };

        let policy = self.store.current().await;

        if policy.injector.inject(&host, req.headers_mut()) {
            self.stats.headers_injected.fetch_add(1, Ordering::Relaxed);
        }

        let path = req
            .uri()
            .path_and_query()
            .map(|pq| pq.as_str().to_string())
            .unwrap_or_else(|| "/".to_string());

        let Some(rule) = policy.rules.find(&host, &path) else {
            return RequestOrResponse::Request(req);
        };

        let req_id = Uuid::new_v4().to_string();
        info!("Request [{}] {} {} matched rule '{}'", req_id, req.method(), req.uri(), rule.name);

        let action = self.resolver.resolve(rule, &policy.language_pack).await;
        self.stats.record_action(&action);
        let kind = action.kind();

        match action.into_response() {
            Some(response) => {
                info!("Request [{}] answered by proxy ({}, status {})", req_id, kind, response.status());
                RequestOrResponse::Response(response)
            }
            None => RequestOrResponse::Request(req),
        }
    }
}

/// Host of the request, from the absolute URI or the Host header.
pub fn request_host(req: &Request<Body>) -> Option<String> {
    if let Some(host) = req.uri().host() {
        return Some(host.to_ascii_lowercase());
    }
    req.headers()
        .get(HOST)
        .and_then(|v| v.to_str().ok())
        .map(|v| strip_port(v.trim()).to_ascii_lowercase())
        .filter(|h| !h.is_empty())
}

#[async_trait::async_trait]
impl HttpHandler for InterceptHandler {
    async fn handle_request(&mut self, _ctx: &HttpContext, req: Request<Body>) -> RequestOrResponse {
        self.intercept(req).await
    }
}
