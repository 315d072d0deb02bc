// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Ordered filter routes and request processing around a handler.

use std::sync::Arc;
use std::time::Instant;
use tokio::sync::RwLock;

use super::route::{FilterRoute, FilterRouteConfig};
use crate::config::Config;
use crate::core::{Filter, HttpMethod, HttpRequest, HttpResponse, RequestHandler, WaypointError};
use crate::{debug_fmt, info_fmt};

/// Configuration key holding the filter routes.
pub const FILTERS_KEY: &str = "filters";

/// Filter routes sorted by ascending order; routes with equal order keep
/// their insertion order.
#[derive(Debug, Default)]
pub struct FilterChain {
    routes: RwLock<Vec<FilterRoute>>,
}

impl FilterChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the chain declared under `filters`.
    pub async fn from_config(config: &Config) -> Result<Self, WaypointError> {
        let chain = Self::new();
        let routes: Vec<FilterRouteConfig> = config.get_or_default(FILTERS_KEY, Vec::new())?;

        for route_config in routes {
            chain.add_route(FilterRoute::from_config(route_config)?).await?;
        }

        info_fmt!("FilterChain", "Loaded {} filter routes", chain.len().await);
        Ok(chain)
    }

    /// Validate `route` and insert it after every route of lower or equal
    /// order.
    pub async fn add_route(&self, route: FilterRoute) -> Result<(), WaypointError> {
        route.validate()?;

        let mut routes = self.routes.write().await;
        let at = routes.partition_point(|r| r.order() <= route.order());
        debug_fmt!(
            "FilterChain",
            "Adding filter '{}' ({} {:?}) at position {}",
            route.name(),
            route.style(),
            route.patterns(),
            at
        );
        routes.insert(at, route);
        Ok(())
    }

    /// Remove every route whose filter is called `name`. Returns how many were
    /// removed.
    pub async fn remove_route(&self, name: &str) -> usize {
        let mut routes = self.routes.write().await;
        let before = routes.len();
        routes.retain(|r| r.name() != name);
        before - routes.len()
    }

    pub async fn len(&self) -> usize {
        self.routes.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.routes.read().await.is_empty()
    }

    /// A snapshot of the routes in execution order.
    pub async fn routes(&self) -> Vec<FilterRoute> {
        self.routes.read().await.clone()
    }

    /// Filters that apply to `method` and `path`, in execution order.
    pub async fn matching(&self, method: HttpMethod, path: &str) -> Vec<Arc<dyn Filter>> {
        self.routes
            .read()
            .await
            .iter()
            .filter(|r| r.matches(method, path))
            .map(|r| Arc::clone(r.filter()))
            .collect()
    }

    /// Run the matching pre-filters in order, then `handler`, then the
    /// matching post-filters in reverse order. The first error aborts the
    /// request.
    pub async fn process(
        &self,
        mut request: HttpRequest,
        handler: &dyn RequestHandler,
    ) -> Result<HttpResponse, WaypointError> {
        let filters = self.matching(request.method, &request.path).await;
        debug_fmt!(
            "FilterChain",
            "{} {} matched {} filters",
            request.method,
            request.path,
            filters.len()
        );

        for filter in filters.iter().filter(|f| f.filter_type().is_pre()) {
            request = filter.pre_filter(request).await?;
        }

        let mut response = handler.handle(request.clone()).await?;
        response.context.write().await.receive_time = Some(Instant::now());

        for filter in filters.iter().rev().filter(|f| f.filter_type().is_post()) {
            response = filter.post_filter(&request, response).await?;
        }

        Ok(response)
    }
}
