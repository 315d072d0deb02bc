// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::sync::Arc;

use super::balancer::LazyResolver;
use super::config::{HttpClientSenderConfig, SENDER_KEY};
use super::instrument::InvocationInstrumenterFactory;
use super::SpanSender;
use crate::config::Config;
use crate::core::WaypointError;
use crate::{debug_fmt, info_fmt};

/// Builds the HTTP span sender from its configuration.
#[derive(Debug, Clone)]
pub struct HttpClientSenderFactory {
    configuration: HttpClientSenderConfig,
    invocation_instrumenter_factories: Vec<Arc<dyn InvocationInstrumenterFactory>>,
}

impl HttpClientSenderFactory {
    /// `invocation_instrumenter_factories` keep the order they are given in.
    pub fn new<I>(configuration: HttpClientSenderConfig, invocation_instrumenter_factories: I) -> Self
    where
        I: IntoIterator<Item = Arc<dyn InvocationInstrumenterFactory>>,
    {
        Self {
            configuration,
            invocation_instrumenter_factories: invocation_instrumenter_factories.into_iter().collect(),
        }
    }

    /// A factory for the sender configured under `tracing.sender`, or `None`
    /// when that section is absent.
    pub fn from_config<I>(config: &Config, invocation_instrumenter_factories: I) -> Result<Option<Self>, WaypointError>
    where
        I: IntoIterator<Item = Arc<dyn InvocationInstrumenterFactory>>,
    {
        let Some(configuration) = config.get::<HttpClientSenderConfig>(SENDER_KEY)? else {
            debug_fmt!("HttpClientSenderFactory", "No '{}' configuration, no sender", SENDER_KEY);
            return Ok(None);
        };
        Ok(Some(Self::new(configuration, invocation_instrumenter_factories)))
    }

    pub fn configuration(&self) -> &HttpClientSenderConfig {
        &self.configuration
    }

    pub fn invocation_instrumenter_factories(&self) -> &[Arc<dyn InvocationInstrumenterFactory>] {
        &self.invocation_instrumenter_factories
    }

    /// Build the sender. The resolver is handed over unresolved.
    pub fn span_sender(&self, load_balancer_resolver: LazyResolver) -> Result<Arc<dyn SpanSender>, WaypointError> {
        let sender = self
            .configuration
            .builder()
            .invocation_instrumenter_factories(self.invocation_instrumenter_factories.clone())
            .build(load_balancer_resolver)?;
        Ok(Arc::new(sender))
    }

    /// Keep `registered` if there is one; otherwise create a sender. `create`
    /// is not called when a sender is already registered.
    pub fn register_if_missing<F>(
        registered: Option<Arc<dyn SpanSender>>,
        create: F,
    ) -> Result<Arc<dyn SpanSender>, WaypointError>
    where
        F: FnOnce() -> Result<Arc<dyn SpanSender>, WaypointError>,
    {
        match registered {
            Some(sender) => {
                debug_fmt!(
                    "HttpClientSenderFactory",
                    "Sender '{}' already registered, skipping",
                    sender.name()
                );
                Ok(sender)
            }
            None => {
                let sender = create()?;
                info_fmt!("HttpClientSenderFactory", "Registered sender '{}'", sender.name());
                Ok(sender)
            }
        }
    }
}
