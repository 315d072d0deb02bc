// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Bootstrap – configuration in, ready-to-use [`Waypoint`] out.
//!
//! [`WaypointLoader`] assembles the configuration stack, initialises
//! logging, builds the [`FilterChain`] and registers a span sender when
//! `tracing.sender` is configured and no sender was supplied up front.


use log::LevelFilter;
use std::sync::Arc;
use thiserror::Error;

use crate::config::{Config, ConfigError, ConfigProvider, EnvConfigProvider, FileConfigProvider};
use crate::core::{HttpRequest, HttpResponse, RequestHandler, WaypointError};
use crate::filters::{FilterChain, FilterRoute};
use crate::logging::config::LoggingConfig;
use crate::logging::{init_with_config, log_error, log_info};
use crate::sender::{
    HttpClientSenderFactory, InvocationInstrumenterFactory, LazyResolver, SpanSender,
};
use crate::debug_fmt;

/// Configuration key of the logging section.
pub const LOGGING_KEY: &str = "logging";

/// Errors raised while bootstrapping.
#[derive(Error, Debug)]
pub enum LoaderError {
    /// Configuration error
    #[error("configuration error: {0}")]
    ConfigError(#[from] ConfigError),

    /// Filter or sender setup failed
    #[error("waypoint error: {0}")]
    WaypointError(#[from] WaypointError),

    /// IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

/// Builder for [`Waypoint`].
#[derive(Debug, Default)]
pub struct WaypointLoader {
    config: Option<Config>,
    config_file_path: Option<String>,
    use_env_vars: bool,
    env_prefix: Option<String>,
    providers: Vec<Arc<dyn ConfigProvider>>,
    log_level: Option<LevelFilter>,
    filter_routes: Vec<FilterRoute>,
    sender: Option<Arc<dyn SpanSender>>,
    instrumenter_factories: Vec<Arc<dyn InvocationInstrumenterFactory>>,
    resolver: Option<LazyResolver>,
}

impl WaypointLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use `config` as is. File, environment and custom providers are then
    /// ignored.
    pub fn with_config(mut self, config: Config) -> Self {
        self.config = Some(config);
        self
    }

    /// Read a JSON, TOML or YAML file as the lowest-priority source.
    pub fn with_config_file(mut self, file_path: &str) -> Self {
        self.config_file_path = Some(file_path.to_string());
        self
    }

    /// Let `WAYPOINT_*` environment variables override the file.
    pub fn with_env_vars(mut self) -> Self {
        self.use_env_vars = true;
        self
    }

    /// Like [`WaypointLoader::with_env_vars`] with a custom prefix.
    pub fn with_env_prefix(mut self, prefix: &str) -> Self {
        self.env_prefix = Some(prefix.to_string());
        self.use_env_vars = true;
        self
    }

    /// Add a provider above the file and environment providers. Providers
    /// added later win.
    pub fn with_provider<P: ConfigProvider + 'static>(mut self, provider: P) -> Self {
        self.providers.push(Arc::new(provider));
        self
    }

    /// Log at `level` regardless of the `logging` section.
    pub fn with_log_level(mut self, level: LevelFilter) -> Self {
        self.log_level = Some(level);
        self
    }

    /// Add a route in addition to the configured ones.
    pub fn with_filter_route(mut self, route: FilterRoute) -> Self {
        self.filter_routes.push(route);
        self
    }

    /// Register `sender` up front; the configured HTTP sender is then not
    /// built.
    pub fn with_sender(mut self, sender: Arc<dyn SpanSender>) -> Self {
        self.sender = Some(sender);
        self
    }

    /// Wrap every send of the HTTP sender. Factories run in the order added.
    pub fn with_instrumenter_factory(mut self, factory: Arc<dyn InvocationInstrumenterFactory>) -> Self {
        self.instrumenter_factories.push(factory);
        self
    }

    /// Resolver for `tracing.sender.urls`; defaults to an empty
    /// `StaticLoadBalancerResolver`.
    pub fn with_load_balancer_resolver(mut self, resolver: LazyResolver) -> Self {
        self.resolver = Some(resolver);
        self
    }

    fn assemble_config(&mut self) -> Result<Config, LoaderError> {
        if let Some(config) = self.config.take() {
            return Ok(config);
        }

        let mut builder = Config::builder();
        if let Some(file_path) = &self.config_file_path {
            builder = builder.with_provider(FileConfigProvider::new(file_path)?);
        }
        if self.use_env_vars {
            builder = match &self.env_prefix {
                Some(prefix) => builder.with_provider(EnvConfigProvider::new(prefix)),
                None => builder.with_provider(EnvConfigProvider::default()),
            };
        }
        for provider in self.providers.drain(..) {
            builder = builder.with_shared_provider(provider);
        }
        Ok(builder.build())
    }

    fn init_logging(&self, config: &Config) {
        match config.get::<LoggingConfig>(LOGGING_KEY) {
            Ok(logging_config) => init_with_config(self.log_level, logging_config),
            Err(e) => {
                init_with_config(self.log_level, None);
                log_error("Startup", format!("Failed to read logging configuration: {e}"));
            }
        }
    }

    /// Assemble everything.
    pub async fn build(mut self) -> Result<Waypoint, LoaderError> {
        let config = self.assemble_config()?;
        self.init_logging(&config);
        log_info("Startup", format!("Configuration sources: {:?}", config.provider_names()));

        let filter_chain = FilterChain::from_config(&config).await?;
        for route in self.filter_routes {
            filter_chain.add_route(route).await?;
        }

        let sender = match HttpClientSenderFactory::from_config(&config, self.instrumenter_factories)? {
            Some(factory) => {
                let resolver = self.resolver.unwrap_or_default();
                Some(HttpClientSenderFactory::register_if_missing(self.sender, || {
                    factory.span_sender(resolver)
                })?)
            }
            None => self.sender,
        };
        if sender.is_none() {
            debug_fmt!("Startup", "Span reporting disabled");
        }

        Ok(Waypoint {
            config: Arc::new(config),
            filter_chain: Arc::new(filter_chain),
            sender,
        })
    }
}

/// An assembled filter chain and, when configured, a span sender.
#[derive(Debug, Clone)]
pub struct Waypoint {
    config: Arc<Config>,
    filter_chain: Arc<FilterChain>,
    sender: Option<Arc<dyn SpanSender>>,
}

impl Waypoint {
    pub fn loader() -> WaypointLoader {
        WaypointLoader::new()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn filter_chain(&self) -> &Arc<FilterChain> {
        &self.filter_chain
    }

    /// The registered sender, if any.
    pub fn sender(&self) -> Option<&Arc<dyn SpanSender>> {
        self.sender.as_ref()
    }

    /// Run `request` through the filter chain around `handler`.
    pub async fn process(
        &self,
        request: HttpRequest,
        handler: &dyn RequestHandler,
    ) -> Result<HttpResponse, WaypointError> {
        self.filter_chain.process(request, handler).await
    }
}
