// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Endpoint selection for the sender.

use async_trait::async_trait;
use once_cell::sync::OnceCell;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::core::WaypointError;
use crate::debug_fmt;

/// Picks the base URL for the next request.
#[async_trait]
pub trait LoadBalancer: fmt::Debug + Send + Sync {
    async fn select(&self) -> Result<String, WaypointError>;
}

/// Always selects the same URL.
#[derive(Debug, Clone)]
pub struct FixedLoadBalancer {
    url: String,
}

impl FixedLoadBalancer {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl LoadBalancer for FixedLoadBalancer {
    async fn select(&self) -> Result<String, WaypointError> {
        Ok(self.url.clone())
    }
}

/// Turns service references (URLs or service ids) into a load balancer.
pub trait LoadBalancerResolver: fmt::Debug + Send + Sync {
    /// `None` when no reference can be resolved.
    fn resolve(&self, references: &[String]) -> Option<Arc<dyn LoadBalancer>>;
}

/// Resolves absolute http(s) URLs directly and anything else through a
/// fixed table of service ids.
#[derive(Debug, Clone, Default)]
pub struct StaticLoadBalancerResolver {
    services: HashMap<String, String>,
}

impl StaticLoadBalancerResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Map `service_id` to `url`.
    pub fn with_service(mut self, service_id: impl Into<String>, url: impl Into<String>) -> Self {
        self.services.insert(service_id.into(), url.into());
        self
    }
}

fn is_absolute_http(reference: &str) -> bool {
    reqwest::Url::parse(reference)
        .map(|url| matches!(url.scheme(), "http" | "https") && url.has_host())
        .unwrap_or(false)
}

impl LoadBalancerResolver for StaticLoadBalancerResolver {
    fn resolve(&self, references: &[String]) -> Option<Arc<dyn LoadBalancer>> {
        let reference = references.first()?;
        let url = if is_absolute_http(reference) {
            reference.clone()
        } else {
            self.services.get(reference)?.clone()
        };
        debug_fmt!("LoadBalancerResolver", "Resolved '{}' to {}", reference, url);
        Some(Arc::new(FixedLoadBalancer::new(url)))
    }
}

type ResolverInit = dyn Fn() -> Arc<dyn LoadBalancerResolver> + Send + Sync;

/// A resolver that is constructed on first use, at most once. Clones share
/// the same instance.
#[derive(Clone)]
pub struct LazyResolver {
    init: Arc<ResolverInit>,
    cell: Arc<OnceCell<Arc<dyn LoadBalancerResolver>>>,
}

impl LazyResolver {
    /// Defer construction to `init`.
    pub fn new<F>(init: F) -> Self
    where
        F: Fn() -> Arc<dyn LoadBalancerResolver> + Send + Sync + 'static,
    {
        Self {
            init: Arc::new(init),
            cell: Arc::new(OnceCell::new()),
        }
    }

    /// Wrap an already constructed resolver.
    pub fn ready(resolver: Arc<dyn LoadBalancerResolver>) -> Self {
        let fallback = Arc::clone(&resolver);
        Self {
            init: Arc::new(move || Arc::clone(&fallback)),
            cell: Arc::new(OnceCell::with_value(resolver)),
        }
    }

    /// The resolver, constructing it on the first call.
    pub fn get(&self) -> &Arc<dyn LoadBalancerResolver> {
        self.cell.get_or_init(|| (self.init)())
    }

    pub fn is_resolved(&self) -> bool {
        self.cell.get().is_some()
    }
}

impl Default for LazyResolver {
    fn default() -> Self {
        Self::new(|| Arc::new(StaticLoadBalancerResolver::new()))
    }
}

impl fmt::Debug for LazyResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LazyResolver")
            .field("resolved", &self.is_resolved())
            .finish()
    }
}
