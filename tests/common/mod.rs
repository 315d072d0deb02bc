// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Shared helpers for the integration tests.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use waypoint::config::{ConfigError, ConfigProvider};
use waypoint::{HttpRequest, HttpResponse, RequestHandler, WaypointError};

/// Answers every key of a JSON document, nested objects included, by its
/// dotted path.
#[allow(dead_code)]
#[derive(Debug, Clone)]
pub struct TestConfigProvider {
    values: HashMap<String, Value>,
}

#[allow(dead_code)]
impl TestConfigProvider {
    pub fn from_json(config: Value) -> Self {
        let mut values = HashMap::new();
        Self::flatten(&config, "", &mut values);
        Self { values }
    }

    fn flatten(value: &Value, prefix: &str, values: &mut HashMap<String, Value>) {
        if let Value::Object(map) = value {
            for (key, child) in map {
                let key = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{prefix}.{key}")
                };
                values.insert(key.clone(), child.clone());
                Self::flatten(child, &key, values);
            }
        }
    }
}

impl ConfigProvider for TestConfigProvider {
    fn has(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    fn provider_name(&self) -> &str {
        "test"
    }

    fn get_raw(&self, key: &str) -> Result<Option<Value>, ConfigError> {
        Ok(self.values.get(key).cloned())
    }
}

/// Terminal handler answering with a fixed status and recording the paths
/// it saw.
#[allow(dead_code)]
#[derive(Debug, Default)]
pub struct RecordingHandler {
    pub status: u16,
    pub seen: Arc<Mutex<Vec<String>>>,
}

#[allow(dead_code)]
impl RecordingHandler {
    pub fn new(status: u16) -> Self {
        Self {
            status,
            seen: Arc::default(),
        }
    }
}

#[async_trait]
impl RequestHandler for RecordingHandler {
    async fn handle(&self, request: HttpRequest) -> Result<HttpResponse, WaypointError> {
        self.seen.lock().unwrap().push(request.path.clone());
        let mut response = HttpResponse::new(self.status);
        response.headers = request.headers;
        Ok(response)
    }
}

#[allow(dead_code)]
pub fn init_test_logging() {
    waypoint::logging::init(Some(log::LevelFilter::Debug));
}
