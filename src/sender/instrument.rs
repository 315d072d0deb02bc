// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Decorators around outgoing sender invocations.

use std::fmt::Debug;
use std::sync::Arc;
use std::time::Instant;
use uuid::Uuid;

use crate::{debug_fmt, trace_fmt};

/// Hooks run around a single invocation.
pub trait InvocationInstrumenter: Send {
    fn before_invocation(&mut self);

    fn after_invocation(&mut self);
}

/// Produces one instrumenter per invocation. Returning `None` opts out of
/// that invocation.
pub trait InvocationInstrumenterFactory: Debug + Send + Sync {
    fn new_invocation_instrumenter(&self) -> Option<Box<dyn InvocationInstrumenter>>;
}

/// Instrumenters active for one invocation. Created instrumenters run
/// `before_invocation` in factory order; `after_invocation` runs in reverse
/// order when the scope is dropped, whether or not the invocation succeeded.
pub(crate) struct InvocationScope {
    active: Vec<Box<dyn InvocationInstrumenter>>,
}

impl InvocationScope {
    pub(crate) fn open(factories: &[Arc<dyn InvocationInstrumenterFactory>]) -> Self {
        let mut active = Vec::with_capacity(factories.len());
        for factory in factories {
            if let Some(mut instrumenter) = factory.new_invocation_instrumenter() {
                instrumenter.before_invocation();
                active.push(instrumenter);
            }
        }
        Self { active }
    }
}

impl Drop for InvocationScope {
    fn drop(&mut self) {
        for instrumenter in self.active.iter_mut().rev() {
            instrumenter.after_invocation();
        }
    }
}

/// Logs the start and duration of every invocation.
#[derive(Debug, Default, Clone)]
pub struct LoggingInstrumenterFactory;

impl InvocationInstrumenterFactory for LoggingInstrumenterFactory {
    fn new_invocation_instrumenter(&self) -> Option<Box<dyn InvocationInstrumenter>> {
        Some(Box::new(LoggingInstrumenter {
            id: Uuid::new_v4(),
            started: None,
        }))
    }
}

struct LoggingInstrumenter {
    id: Uuid,
    started: Option<Instant>,
}

impl InvocationInstrumenter for LoggingInstrumenter {
    fn before_invocation(&mut self) {
        trace_fmt!("HttpClientSender", "invocation {} started", self.id);
        self.started = Some(Instant::now());
    }

    fn after_invocation(&mut self) {
        if let Some(started) = self.started.take() {
            debug_fmt!(
                "HttpClientSender",
                "invocation {} finished in {:?}",
                self.id,
                started.elapsed()
            );
        }
    }
}
