pub mod har;
pub mod types;

use anyhow::Result;
use log::info;
use regex::Regex;
use std::collections::BTreeMap;

pub use types::{AuthType, Endpoint, EndpointMap, Exchange, FieldType, TrafficRecord};

/// Headers never reported as application-specific common headers.
const SKIP_HEADERS: &[&str] = &[
    "host",
    "user-agent",
    "accept",
    "accept-encoding",
    "accept-language",
    "connection",
    "content-length",
    "content-type",
    "cookie",
    "authorization",
];

/// Builds endpoint maps from observed HTTP traffic.
///
/// Dependency inference is a single-hop heuristic: one creator endpoint per
/// leading resource segment. Parent/child/grandchild chains are not modeled.
pub struct EndpointMapper {
    uuid_re: Regex,
    numeric_re: Regex,
}

impl Default for EndpointMapper {
    fn default() -> Self {
        Self::new()
    }
}

impl EndpointMapper {
    pub fn new() -> Self {
        Self {
            uuid_re: Regex::new(
                r"^(?i)[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}$",
            )
            .expect("valid uuid regex"),
            numeric_re: Regex::new(r"^\d+$").expect("valid numeric regex"),
        }
    }

    /// Fold a traffic record into a normalized, deduplicated endpoint map.
    pub fn map_traffic(&self, record: &TrafficRecord) -> Result<EndpointMap> {
        let exchanges = &record.exchanges;
        if exchanges.is_empty() {
            anyhow::bail!("No HTTP exchanges to map");
        }

        // Group by (method, normalized path); BTreeMap gives the (method, path)
        // emission order for free.
        let mut grouped: BTreeMap<(String, String), Vec<&Exchange>> = BTreeMap::new();
        for exchange in exchanges {
            let normalized = self.normalize_path(&exchange.path);
            grouped
                .entry((exchange.method.clone(), normalized))
                .or_default()
                .push(exchange);
        }

        let endpoints: Vec<Endpoint> = grouped
            .iter()
            .map(|((method, path), group)| self.build_endpoint(method, path, group))
            .collect();

        let dependencies = detect_dependencies(&endpoints);
        let auth_patterns = detect_auth_patterns(exchanges);
        let common_headers = detect_common_headers(exchanges);

        info!(
            "Mapped {} endpoints from {} exchanges",
            endpoints.len(),
            exchanges.len()
        );

        Ok(EndpointMap {
            app_name: record.app_name.clone(),
            base_url: record.base_url.clone(),
            endpoints,
            auth_patterns,
            common_headers,
            dependencies,
        })
    }

    /// Replace numeric segments with `{id}` and UUID-shaped segments with
    /// `{uuid}`. Idempotent: placeholders match neither pattern.
    pub fn normalize_path(&self, path: &str) -> String {
        let parts: Vec<String> = path
            .trim_matches('/')
            .split('/')
            .map(|part| {
                if self.numeric_re.is_match(part) {
                    "{id}".to_string()
                } else if self.uuid_re.is_match(part) {
                    "{uuid}".to_string()
                } else {
                    part.to_string()
                }
            })
            .collect();
        format!("/{}", parts.join("/"))
    }

    fn build_endpoint(&self, method: &str, path: &str, group: &[&Exchange]) -> Endpoint {
        let mut status_codes: Vec<u16> = group.iter().map(|ex| ex.status_code).collect();
        status_codes.sort_unstable();
        status_codes.dedup();

        let auth_header = group.iter().find_map(|ex| header_value(&ex.request_headers, "authorization"));
        let auth_required = auth_header.is_some();
        let auth_type = auth_header.map(|value| {
            if value.starts_with("Bearer ") {
                AuthType::Bearer
            } else if value.starts_with("Basic ") {
                AuthType::Basic
            } else {
                AuthType::Custom
            }
        });

        let mut query_params: Vec<String> = group
            .iter()
            .flat_map(|ex| ex.query_params.keys().cloned())
            .collect();
        query_params.sort();
        query_params.dedup();

        let path_param_re = Regex::new(r"\{(\w+)\}").expect("valid path param regex");
        let path_params: Vec<String> = path_param_re
            .captures_iter(path)
            .map(|cap| cap[1].to_string())
            .collect();

        // Deliberate single-sample inference: the first JSON-bearing exchange
        // in the group defines the schema.
        let request_schema = group
            .iter()
            .find(|ex| ex.is_json_request())
            .and_then(|ex| ex.request_body.as_ref())
            .and_then(|body| body.as_object().map(infer_schema));

        let response_schema = group
            .iter()
            .find(|ex| ex.is_json_response() && ex.is_success())
            .and_then(|ex| ex.response_body.as_ref())
            .and_then(|body| body.as_object().map(infer_schema));

        let sample_request = group
            .iter()
            .find_map(|ex| ex.request_body.clone());
        let sample_response = group
            .iter()
            .find(|ex| ex.is_json_response() && ex.is_success())
            .and_then(|ex| ex.response_body.clone());

        Endpoint {
            method: method.to_string(),
            path: path.to_string(),
            description: String::new(),
            request_schema,
            response_schema,
            auth_required,
            auth_type,
            query_params,
            path_params,
            observed_status_codes: status_codes,
            sample_request,
            sample_response,
        }
    }
}

/// Map each JSON field to an inferred type. Objects recurse; everything else
/// flattens to a scalar kind.
fn infer_schema(data: &serde_json::Map<String, serde_json::Value>) -> BTreeMap<String, FieldType> {
    let mut schema = BTreeMap::new();
    for (key, value) in data {
        let field = match value {
            serde_json::Value::String(_) => FieldType::String,
            serde_json::Value::Bool(_) => FieldType::Boolean,
            serde_json::Value::Number(n) => {
                if n.is_i64() || n.is_u64() {
                    FieldType::Integer
                } else {
                    FieldType::Number
                }
            }
            serde_json::Value::Array(_) => FieldType::Array,
            serde_json::Value::Object(obj) => FieldType::Object(infer_schema(obj)),
            serde_json::Value::Null => FieldType::Nullable,
        };
        schema.insert(key.clone(), field);
    }
    schema
}

/// Endpoints with path parameters depend on the POST endpoint that creates
/// the resource named by their first path segment, when one was observed.
fn detect_dependencies(endpoints: &[Endpoint]) -> BTreeMap<String, Vec<String>> {
    let mut creators: BTreeMap<String, String> = BTreeMap::new();
    for endpoint in endpoints {
        if endpoint.method == "POST" && endpoint.path_params.is_empty() {
            if let Some(resource) = leading_segment(&endpoint.path) {
                creators.insert(resource.to_string(), endpoint.key());
            }
        }
    }

    let mut deps = BTreeMap::new();
    for endpoint in endpoints {
        if endpoint.path_params.is_empty() {
            continue;
        }
        if let Some(resource) = leading_segment(&endpoint.path) {
            if let Some(creator) = creators.get(resource) {
                deps.insert(endpoint.key(), vec![creator.clone()]);
            }
        }
    }
    deps
}

fn leading_segment(path: &str) -> Option<&str> {
    path.trim_matches('/').split('/').next().filter(|s| !s.is_empty())
}

/// Authentication conventions observed anywhere in the capture.
fn detect_auth_patterns(exchanges: &[Exchange]) -> Vec<String> {
    let mut patterns = Vec::new();
    let mut push = |p: &str| {
        if !patterns.iter().any(|existing: &String| existing == p) {
            patterns.push(p.to_string());
        }
    };

    for exchange in exchanges {
        for (key, value) in &exchange.request_headers {
            let lower = key.to_lowercase();
            if lower == "authorization" {
                if value.starts_with("Bearer ") {
                    push("Bearer token");
                } else if value.starts_with("Basic ") {
                    push("Basic auth");
                } else {
                    push("Custom auth header");
                }
            } else if lower == "x-api-key" {
                push("API key header");
            } else if lower == "cookie" {
                push("Cookie-based session");
            }
        }
    }
    patterns.sort();
    patterns
}

/// Headers present in every exchange, minus transport/content noise.
fn detect_common_headers(exchanges: &[Exchange]) -> BTreeMap<String, String> {
    let mut common = BTreeMap::new();
    let Some(first) = exchanges.first() else {
        return common;
    };

    for (name, value) in &first.request_headers {
        let lower = name.to_lowercase();
        if SKIP_HEADERS.contains(&lower.as_str()) {
            continue;
        }
        let in_all = exchanges.iter().all(|ex| {
            ex.request_headers
                .keys()
                .any(|k| k.to_lowercase() == lower)
        });
        if in_all {
            common.insert(lower, value.clone());
        }
    }
    common
}

fn header_value(headers: &BTreeMap<String, String>, name: &str) -> Option<String> {
    headers
        .iter()
        .find(|(k, _)| k.to_lowercase() == name)
        .map(|(_, v)| v.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;

    fn exchange(method: &str, path: &str, status: u16) -> Exchange {
        Exchange {
            method: method.to_string(),
            url: format!("http://localhost:5000{}", path),
            path: path.to_string(),
            query_params: BTreeMap::new(),
            request_headers: BTreeMap::new(),
            request_body: None,
            request_content_type: None,
            status_code: status,
            response_headers: BTreeMap::new(),
            response_body: None,
            response_content_type: None,
            duration_ms: Some(12.0),
            timestamp: Utc::now(),
        }
    }

    fn record(exchanges: Vec<Exchange>) -> TrafficRecord {
        TrafficRecord {
            session_id: "abc123".to_string(),
            app_name: "demo".to_string(),
            base_url: "http://localhost:5000".to_string(),
            exchanges,
        }
    }

    #[test]
    fn test_normalize_path_placeholders() {
        let mapper = EndpointMapper::new();
        assert_eq!(mapper.normalize_path("/users/123"), "/users/{id}");
        assert_eq!(
            mapper.normalize_path("/orders/550e8400-e29b-41d4-a716-446655440000/items/7"),
            "/orders/{uuid}/items/{id}"
        );
        assert_eq!(mapper.normalize_path("/health"), "/health");
    }

    #[test]
    fn test_normalize_path_is_idempotent() {
        let mapper = EndpointMapper::new();
        let once = mapper.normalize_path("/users/42/posts/9");
        let twice = mapper.normalize_path(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_grouping_partitions_exchanges() {
        let mapper = EndpointMapper::new();
        let rec = record(vec![
            exchange("GET", "/api/users/1", 200),
            exchange("GET", "/api/users/2", 200),
            exchange("GET", "/api/users/3", 404),
            exchange("POST", "/api/users", 201),
        ]);

        let map = mapper.map_traffic(&rec).unwrap();
        assert_eq!(map.endpoint_count(), 2);

        let get = map
            .endpoints
            .iter()
            .find(|e| e.method == "GET")
            .unwrap();
        assert_eq!(get.path, "/api/users/{id}");
        assert_eq!(get.observed_status_codes, vec![200, 404]);
        assert_eq!(get.path_params, vec!["id"]);
    }

    #[test]
    fn test_endpoints_sorted_by_method_then_path() {
        let mapper = EndpointMapper::new();
        let rec = record(vec![
            exchange("POST", "/api/users", 201),
            exchange("GET", "/api/users", 200),
            exchange("DELETE", "/api/users/5", 204),
        ]);

        let map = mapper.map_traffic(&rec).unwrap();
        let keys: Vec<String> = map.endpoints.iter().map(|e| e.key()).collect();
        assert_eq!(
            keys,
            vec!["DELETE /api/users/{id}", "GET /api/users", "POST /api/users"]
        );
    }

    #[test]
    fn test_schema_inference_uses_first_json_exchange() {
        let mapper = EndpointMapper::new();
        let mut first = exchange("POST", "/api/users", 201);
        first.request_content_type = Some("application/json".to_string());
        first.request_body = Some(json!({
            "name": "Ada",
            "age": 36,
            "score": 9.5,
            "admin": false,
            "tags": ["a"],
            "address": {"city": "London"},
            "nickname": null
        }));
        let mut second = exchange("POST", "/api/users", 201);
        second.request_content_type = Some("application/json".to_string());
        second.request_body = Some(json!({"name": "Bob", "extra_field": true}));

        let map = mapper.map_traffic(&record(vec![first, second])).unwrap();
        let schema = map.endpoints[0].request_schema.as_ref().unwrap();

        assert_eq!(schema["name"], FieldType::String);
        assert_eq!(schema["age"], FieldType::Integer);
        assert_eq!(schema["score"], FieldType::Number);
        assert_eq!(schema["admin"], FieldType::Boolean);
        assert_eq!(schema["tags"], FieldType::Array);
        assert_eq!(schema["nickname"], FieldType::Nullable);
        match &schema["address"] {
            FieldType::Object(inner) => assert_eq!(inner["city"], FieldType::String),
            other => panic!("expected object, got {:?}", other),
        }
        // Single-sample inference: the second exchange's field is not unioned in
        assert!(!schema.contains_key("extra_field"));
    }

    #[test]
    fn test_auth_detection() {
        let mapper = EndpointMapper::new();
        let mut ex = exchange("GET", "/api/private", 200);
        ex.request_headers
            .insert("Authorization".to_string(), "Bearer tok123".to_string());

        let map = mapper.map_traffic(&record(vec![ex])).unwrap();
        let endpoint = &map.endpoints[0];
        assert!(endpoint.auth_required);
        assert_eq!(endpoint.auth_type, Some(AuthType::Bearer));
        assert_eq!(map.auth_patterns, vec!["Bearer token"]);
    }

    #[test]
    fn test_dependency_heuristic_single_hop() {
        let mapper = EndpointMapper::new();
        let rec = record(vec![
            exchange("POST", "/users", 201),
            exchange("GET", "/users/1", 200),
            exchange("DELETE", "/users/1", 204),
            exchange("GET", "/health", 200),
        ]);

        let map = mapper.map_traffic(&rec).unwrap();
        assert_eq!(
            map.dependencies.get("GET /users/{id}").unwrap(),
            &vec!["POST /users".to_string()]
        );
        assert_eq!(
            map.dependencies.get("DELETE /users/{id}").unwrap(),
            &vec!["POST /users".to_string()]
        );
        assert!(!map.dependencies.contains_key("GET /health"));
    }

    #[test]
    fn test_common_headers_skip_list() {
        let mapper = EndpointMapper::new();
        let mut a = exchange("GET", "/a", 200);
        a.request_headers
            .insert("X-Request-Id".to_string(), "r1".to_string());
        a.request_headers
            .insert("User-Agent".to_string(), "curl".to_string());
        let mut b = exchange("GET", "/b", 200);
        b.request_headers
            .insert("x-request-id".to_string(), "r2".to_string());
        b.request_headers
            .insert("User-Agent".to_string(), "curl".to_string());

        let map = mapper.map_traffic(&record(vec![a, b])).unwrap();
        assert_eq!(map.common_headers.get("x-request-id").unwrap(), "r1");
        assert!(!map.common_headers.contains_key("user-agent"));
    }

    #[test]
    fn test_empty_traffic_is_an_error() {
        let mapper = EndpointMapper::new();
        assert!(mapper.map_traffic(&record(Vec::new())).is_err());
    }
}
