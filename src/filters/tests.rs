// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use async_trait::async_trait;
use reqwest::header::HeaderValue;
use serde_json::json;
use std::sync::{Arc, Mutex};

use super::*;
use crate::config::Config;
use crate::core::{HttpMethod, RequestHandler};
use crate::pattern::{FilterPatternStyle, PatternError};

type Journal = Arc<Mutex<Vec<String>>>;

/// Records its pre and post invocations into a shared journal.
#[derive(Debug)]
struct RecordingFilter {
    name: String,
    journal: Journal,
}

impl RecordingFilter {
    fn arc(name: &str, journal: &Journal) -> Arc<dyn Filter> {
        Arc::new(Self {
            name: name.to_string(),
            journal: Arc::clone(journal),
        })
    }
}

#[async_trait]
impl Filter for RecordingFilter {
    fn filter_type(&self) -> FilterType {
        FilterType::Both
    }

    fn name(&self) -> &str {
        &self.name
    }

    async fn pre_filter(&self, request: HttpRequest) -> Result<HttpRequest, WaypointError> {
        self.journal.lock().unwrap().push(format!("pre:{}", self.name));
        Ok(request)
    }

    async fn post_filter(
        &self,
        _request: &HttpRequest,
        response: HttpResponse,
    ) -> Result<HttpResponse, WaypointError> {
        self.journal.lock().unwrap().push(format!("post:{}", self.name));
        Ok(response)
    }
}

#[derive(Debug)]
struct FailingFilter;

#[async_trait]
impl Filter for FailingFilter {
    fn filter_type(&self) -> FilterType {
        FilterType::Pre
    }

    fn name(&self) -> &str {
        "failing"
    }

    async fn pre_filter(&self, _request: HttpRequest) -> Result<HttpRequest, WaypointError> {
        Err(WaypointError::FilterError("rejected".to_string()))
    }
}

/// Answers 200 and echoes the request headers back.
#[derive(Debug, Default)]
struct EchoHandler {
    journal: Option<Journal>,
}

#[async_trait]
impl RequestHandler for EchoHandler {
    async fn handle(&self, request: HttpRequest) -> Result<HttpResponse, WaypointError> {
        if let Some(journal) = &self.journal {
            journal.lock().unwrap().push("handler".to_string());
        }
        let mut response = HttpResponse::new(200);
        response.headers = request.headers;
        Ok(response)
    }
}

fn journal() -> Journal {
    Arc::new(Mutex::new(Vec::new()))
}

#[test]
fn test_route_defaults_to_catch_all_ant() {
    let route = FilterRoute::new(RecordingFilter::arc("a", &journal()));
    assert_eq!(route.patterns(), [MATCH_ALL_PATTERN]);
    assert_eq!(route.style(), FilterPatternStyle::Ant);
    assert!(route.methods().is_empty());
    assert!(route.matches(HttpMethod::Get, "/"));
    assert!(route.matches(HttpMethod::Delete, "/deep/nested/path"));
}

#[test]
fn test_route_with_pattern_replaces_catch_all() {
    let route = FilterRoute::new(RecordingFilter::arc("a", &journal()))
        .with_pattern("/api/**")
        .with_pattern("/health");
    assert_eq!(route.patterns(), ["/api/**", "/health"]);
    assert!(route.matches(HttpMethod::Get, "/api/users/7"));
    assert!(route.matches(HttpMethod::Get, "/health"));
    assert!(!route.matches(HttpMethod::Get, "/admin"));
}

#[test]
fn test_route_uses_style_matcher() {
    let filter = RecordingFilter::arc("a", &journal());

    let regex = FilterRoute::new(Arc::clone(&filter))
        .with_pattern("/api/v[0-9]+/.*")
        .with_style(FilterPatternStyle::Regex);
    assert!(regex.matches(HttpMethod::Get, "/api/v2/users"));
    assert!(!regex.matches(HttpMethod::Get, "/api/vx/users"));

    // The same text read as an Ant pattern is literal apart from `*`.
    let ant = FilterRoute::new(filter).with_pattern("/api/v[0-9]+/.*");
    assert!(!ant.matches(HttpMethod::Get, "/api/v2/users"));
    assert!(ant.matches(HttpMethod::Get, "/api/v[0-9]+/.json"));
}

#[test]
fn test_route_method_restriction() {
    let route = FilterRoute::new(RecordingFilter::arc("a", &journal()))
        .with_method(HttpMethod::Post)
        .with_method(HttpMethod::Put)
        .with_method(HttpMethod::Post);
    assert_eq!(route.methods(), [HttpMethod::Post, HttpMethod::Put]);
    assert!(route.matches(HttpMethod::Post, "/x"));
    assert!(!route.matches(HttpMethod::Get, "/x"));
}

#[test]
fn test_route_with_no_patterns_matches_nothing() {
    let route = FilterRoute::new(RecordingFilter::arc("a", &journal())).with_patterns(Vec::<String>::new());
    assert!(!route.matches(HttpMethod::Get, "/"));
    assert!(route.validate().is_ok());
}

#[test]
fn test_route_validate_rejects_bad_regex() {
    let route = FilterRoute::new(RecordingFilter::arc("a", &journal()))
        .with_pattern("/api/(unclosed")
        .with_style(FilterPatternStyle::Regex);
    assert!(matches!(route.validate(), Err(PatternError::InvalidPattern { .. })));
}

#[test]
fn test_route_config_defaults() {
    let config: FilterRouteConfig = serde_json::from_value(json!({ "type": "logging" })).unwrap();
    assert_eq!(config.type_, "logging");
    assert!(config.config.is_null());
    assert_eq!(config.patterns, vec![MATCH_ALL_PATTERN.to_string()]);
    assert_eq!(config.pattern_style, None);
    assert!(config.methods.is_empty());
    assert_eq!(config.order, 0);

    let route = FilterRoute::from_config(config).unwrap();
    assert_eq!(route.style(), FilterPatternStyle::Ant);
    assert_eq!(route.name(), "logging");
}

#[test]
fn test_route_config_full() {
    let config: FilterRouteConfig = serde_json::from_value(json!({
        "type": "header",
        "patterns": ["/api/v[0-9]+/.*"],
        "pattern_style": "regex",
        "methods": ["GET", "HEAD"],
        "order": -5,
        "config": { "add_request_headers": { "x-api": "1" } }
    }))
    .unwrap();

    let route = FilterRoute::from_config(config).unwrap();
    assert_eq!(route.style(), FilterPatternStyle::Regex);
    assert_eq!(route.order(), -5);
    assert!(route.matches(HttpMethod::Head, "/api/v1/x"));
    assert!(!route.matches(HttpMethod::Post, "/api/v1/x"));
}

#[test]
fn test_route_config_unknown_style_fails_to_parse() {
    let result = serde_json::from_value::<FilterRouteConfig>(json!({
        "type": "logging",
        "pattern_style": "GLOB"
    }));
    assert!(result.is_err());
}

#[test]
fn test_route_from_config_rejects_invalid_pattern() {
    let config: FilterRouteConfig = serde_json::from_value(json!({
        "type": "logging",
        "patterns": ["["],
        "pattern_style": "REGEX"
    }))
    .unwrap();
    let err = FilterRoute::from_config(config).unwrap_err();
    assert!(matches!(err, WaypointError::PatternError(_)));
}

#[tokio::test]
async fn test_chain_orders_routes_stably() {
    let journal = journal();
    let chain = FilterChain::new();
    chain.add_route(FilterRoute::new(RecordingFilter::arc("late", &journal)).with_order(10)).await.unwrap();
    chain.add_route(FilterRoute::new(RecordingFilter::arc("first", &journal)).with_order(-1)).await.unwrap();
    chain.add_route(FilterRoute::new(RecordingFilter::arc("mid-a", &journal))).await.unwrap();
    chain.add_route(FilterRoute::new(RecordingFilter::arc("mid-b", &journal))).await.unwrap();

    let names: Vec<String> = chain.routes().await.iter().map(|r| r.name().to_string()).collect();
    assert_eq!(names, ["first", "mid-a", "mid-b", "late"]);
}

#[tokio::test]
async fn test_chain_runs_post_filters_in_reverse() {
    let journal = journal();
    let chain = FilterChain::new();
    chain.add_route(FilterRoute::new(RecordingFilter::arc("outer", &journal))).await.unwrap();
    chain.add_route(FilterRoute::new(RecordingFilter::arc("inner", &journal)).with_order(1)).await.unwrap();
    chain
        .add_route(FilterRoute::new(RecordingFilter::arc("skipped", &journal)).with_pattern("/other/**"))
        .await
        .unwrap();

    let handler = EchoHandler {
        journal: Some(Arc::clone(&journal)),
    };
    let response = chain
        .process(HttpRequest::new(HttpMethod::Get, "/api/items"), &handler)
        .await
        .unwrap();

    assert_eq!(response.status, 200);
    assert!(response.context.read().await.receive_time.is_some());
    assert_eq!(
        *journal.lock().unwrap(),
        ["pre:outer", "pre:inner", "handler", "post:inner", "post:outer"]
    );
}

#[tokio::test]
async fn test_chain_pre_filter_error_stops_processing() {
    let journal = journal();
    let chain = FilterChain::new();
    chain.add_route(FilterRoute::new(Arc::new(FailingFilter))).await.unwrap();
    chain.add_route(FilterRoute::new(RecordingFilter::arc("after", &journal)).with_order(1)).await.unwrap();

    let handler = EchoHandler {
        journal: Some(Arc::clone(&journal)),
    };
    let err = chain
        .process(HttpRequest::new(HttpMethod::Get, "/"), &handler)
        .await
        .unwrap_err();

    assert!(matches!(err, WaypointError::FilterError(msg) if msg == "rejected"));
    assert!(journal.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_chain_add_route_rejects_invalid_pattern() {
    let chain = FilterChain::new();
    let route = FilterRoute::new(RecordingFilter::arc("bad", &journal()))
        .with_pattern("*(")
        .with_style(FilterPatternStyle::Regex);
    assert!(chain.add_route(route).await.is_err());
    assert!(chain.is_empty().await);
}

#[tokio::test]
async fn test_chain_remove_route() {
    let journal = journal();
    let chain = FilterChain::new();
    chain.add_route(FilterRoute::new(RecordingFilter::arc("dup", &journal))).await.unwrap();
    chain.add_route(FilterRoute::new(RecordingFilter::arc("keep", &journal))).await.unwrap();
    chain
        .add_route(FilterRoute::new(RecordingFilter::arc("dup", &journal)).with_pattern("/x"))
        .await
        .unwrap();

    assert_eq!(chain.remove_route("dup").await, 2);
    assert_eq!(chain.remove_route("missing").await, 0);
    assert_eq!(chain.len().await, 1);
}

#[tokio::test]
async fn test_chain_matching_by_method_and_path() {
    let journal = journal();
    let chain = FilterChain::new();
    chain
        .add_route(
            FilterRoute::new(RecordingFilter::arc("writes", &journal))
                .with_pattern("/api/**")
                .with_method(HttpMethod::Post),
        )
        .await
        .unwrap();
    chain
        .add_route(FilterRoute::new(RecordingFilter::arc("static", &journal)).with_pattern("**/*.css"))
        .await
        .unwrap();

    let names = |filters: Vec<Arc<dyn Filter>>| -> Vec<String> {
        filters.iter().map(|f| f.name().to_string()).collect()
    };
    assert_eq!(names(chain.matching(HttpMethod::Post, "/api/a").await), ["writes"]);
    assert!(chain.matching(HttpMethod::Get, "/api/a").await.is_empty());
    assert_eq!(names(chain.matching(HttpMethod::Get, "/assets/site.css").await), ["static"]);
}

#[tokio::test]
async fn test_chain_from_config() {
    let file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
    std::fs::write(
        file.path(),
        json!({
            "filters": [
                { "type": "header", "order": 2,
                  "config": { "add_response_headers": { "x-second": "2" } } },
                { "type": "header", "order": 1, "patterns": ["/api/v[0-9]+/.*"], "pattern_style": "REGEX",
                  "config": { "add_response_headers": { "x-first": "1" } } }
            ]
        })
        .to_string(),
    )
    .unwrap();
    let config = Config::default_file(file.path().to_str().unwrap()).unwrap();

    let chain = FilterChain::from_config(&config).await.unwrap();
    assert_eq!(chain.len().await, 2);

    let response = chain
        .process(HttpRequest::new(HttpMethod::Get, "/api/v1/users"), &EchoHandler::default())
        .await
        .unwrap();
    assert_eq!(response.headers.get("x-first").unwrap(), "1");
    assert_eq!(response.headers.get("x-second").unwrap(), "2");

    let response = chain
        .process(HttpRequest::new(HttpMethod::Get, "/home"), &EchoHandler::default())
        .await
        .unwrap();
    assert!(response.headers.get("x-first").is_none());
    assert_eq!(response.headers.get("x-second").unwrap(), "2");
}

#[tokio::test]
async fn test_chain_from_empty_config() {
    let chain = FilterChain::from_config(&Config::default()).await.unwrap();
    assert!(chain.is_empty().await);
}

#[tokio::test]
async fn test_logging_filter_assigns_trace_id() {
    let filter = LoggingFilter::default();
    let request = filter
        .pre_filter(HttpRequest::new(HttpMethod::Get, "/trace"))
        .await
        .unwrap();

    let trace_id = request.context.read().await.attributes[TRACE_ID_ATTRIBUTE]
        .as_str()
        .unwrap()
        .to_string();
    assert!(uuid::Uuid::parse_str(&trace_id).is_ok());

    let response = filter.post_filter(&request, HttpResponse::new(204)).await.unwrap();
    assert_eq!(response.status, 204);
}

#[tokio::test]
async fn test_logging_filter_propagates_inbound_trace_id() {
    let filter = LoggingFilter::new(LoggingFilterConfig {
        trace_id_header: "x-request-id".to_string(),
        log_level: "info".to_string(),
        ..LoggingFilterConfig::default()
    });
    let mut request = HttpRequest::new(HttpMethod::Post, "/trace");
    request.headers.insert("x-request-id", HeaderValue::from_static("abc-123"));

    let request = filter.pre_filter(request).await.unwrap();
    assert_eq!(
        request.context.read().await.attributes[TRACE_ID_ATTRIBUTE],
        json!("abc-123")
    );
}

#[tokio::test]
async fn test_logging_filter_ignores_inbound_when_not_propagating() {
    let filter = LoggingFilter::new(LoggingFilterConfig {
        propagate_trace_id: false,
        ..LoggingFilterConfig::default()
    });
    let mut request = HttpRequest::new(HttpMethod::Get, "/");
    request.headers.insert("x-trace-id", HeaderValue::from_static("inbound"));

    let request = filter.pre_filter(request).await.unwrap();
    assert_ne!(
        request.context.read().await.attributes[TRACE_ID_ATTRIBUTE],
        json!("inbound")
    );
}

#[tokio::test]
async fn test_header_filter_edits_both_directions() {
    let filter = HeaderFilter::new(HeaderFilterConfig {
        add_request_headers: [("x-added".to_string(), "yes".to_string())].into(),
        remove_request_headers: vec!["x-secret".to_string()],
        add_response_headers: [("x-served-by".to_string(), "waypoint".to_string())].into(),
        remove_response_headers: vec!["server".to_string()],
    })
    .unwrap();

    let mut request = HttpRequest::new(HttpMethod::Get, "/");
    request.headers.insert("x-secret", HeaderValue::from_static("hunter2"));
    let request = filter.pre_filter(request).await.unwrap();
    assert_eq!(request.headers.get("x-added").unwrap(), "yes");
    assert!(request.headers.get("x-secret").is_none());

    let mut response = HttpResponse::new(200);
    response.headers.insert("server", HeaderValue::from_static("upstream"));
    let response = filter.post_filter(&request, response).await.unwrap();
    assert_eq!(response.headers.get("x-served-by").unwrap(), "waypoint");
    assert!(response.headers.get("server").is_none());
}

#[test]
fn test_header_filter_rejects_invalid_names() {
    let err = HeaderFilter::new(HeaderFilterConfig {
        add_request_headers: [("bad header".to_string(), "v".to_string())].into(),
        ..HeaderFilterConfig::default()
    })
    .unwrap_err();
    assert!(matches!(err, WaypointError::FilterError(_)));
}

#[test]
fn test_factory_builtins() {
    let logging = FilterFactory::create_filter("logging", serde_json::Value::Null).unwrap();
    assert_eq!(logging.name(), "logging");
    assert_eq!(logging.filter_type(), FilterType::Both);

    let header = FilterFactory::create_filter("header", json!({ "remove_request_headers": ["cookie"] })).unwrap();
    assert_eq!(header.name(), "header");
}

#[test]
fn test_factory_unknown_type() {
    let err = FilterFactory::create_filter("nope", json!({})).unwrap_err();
    assert!(err.to_string().contains("Unknown filter type: nope"));
}

#[test]
fn test_factory_invalid_config() {
    let err = FilterFactory::create_filter("logging", json!({ "log_request_headers": "often" })).unwrap_err();
    assert!(matches!(err, WaypointError::FilterError(msg) if msg.starts_with("Invalid logging filter config")));
}

#[test]
fn test_register_filter() {
    fn audit(_config: serde_json::Value) -> Result<Arc<dyn Filter>, WaypointError> {
        Ok(Arc::new(FailingFilter))
    }

    register_filter("filters-test-audit", audit);
    let filter = FilterFactory::create_filter("filters-test-audit", json!({})).unwrap();
    assert_eq!(filter.name(), "failing");
}
