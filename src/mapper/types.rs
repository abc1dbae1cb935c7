use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One observed HTTP request/response pair. Immutable once recorded.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Exchange {
    pub method: String,
    pub url: String,
    pub path: String,
    #[serde(default)]
    pub query_params: BTreeMap<String, String>,
    #[serde(default)]
    pub request_headers: BTreeMap<String, String>,
    #[serde(default)]
    pub request_body: Option<serde_json::Value>,
    #[serde(default)]
    pub request_content_type: Option<String>,

    pub status_code: u16,
    #[serde(default)]
    pub response_headers: BTreeMap<String, String>,
    #[serde(default)]
    pub response_body: Option<serde_json::Value>,
    #[serde(default)]
    pub response_content_type: Option<String>,

    #[serde(default)]
    pub duration_ms: Option<f64>,
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
}

impl Exchange {
    pub fn new(method: &str, url: &str, path: &str, status_code: u16) -> Self {
        Self {
            method: method.to_string(),
            url: url.to_string(),
            path: path.to_string(),
            query_params: BTreeMap::new(),
            request_headers: BTreeMap::new(),
            request_body: None,
            request_content_type: None,
            status_code,
            response_headers: BTreeMap::new(),
            response_body: None,
            response_content_type: None,
            duration_ms: None,
            timestamp: Utc::now(),
        }
    }

    pub fn is_json_request(&self) -> bool {
        self.request_content_type
            .as_deref()
            .map_or(false, |ct| ct.contains("json"))
    }

    pub fn is_json_response(&self) -> bool {
        self.response_content_type
            .as_deref()
            .map_or(false, |ct| ct.contains("json"))
    }

    pub fn is_success(&self) -> bool {
        (200..400).contains(&self.status_code)
    }
}

/// A complete traffic capture session for one target application.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrafficRecord {
    pub session_id: String,
    pub app_name: String,
    pub base_url: String,
    #[serde(default)]
    pub exchanges: Vec<Exchange>,
}

impl TrafficRecord {
    pub fn new(app_name: &str, base_url: &str) -> Self {
        Self {
            session_id: uuid::Uuid::new_v4().simple().to_string()[..12].to_string(),
            app_name: app_name.to_string(),
            base_url: base_url.to_string(),
            exchanges: Vec::new(),
        }
    }
}

/// Inferred field type for a JSON body schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    String,
    Integer,
    Number,
    Boolean,
    Array,
    Object(BTreeMap<String, FieldType>),
    Nullable,
}

/// A normalized (method, path-template) unit of API surface.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Endpoint {
    pub method: String,
    pub path: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub request_schema: Option<BTreeMap<String, FieldType>>,
    #[serde(default)]
    pub response_schema: Option<BTreeMap<String, FieldType>>,
    #[serde(default)]
    pub auth_required: bool,
    #[serde(default)]
    pub auth_type: Option<AuthType>,
    #[serde(default)]
    pub query_params: Vec<String>,
    #[serde(default)]
    pub path_params: Vec<String>,
    #[serde(default)]
    pub observed_status_codes: Vec<u16>,
    #[serde(default)]
    pub sample_request: Option<serde_json::Value>,
    #[serde(default)]
    pub sample_response: Option<serde_json::Value>,
}

impl Endpoint {
    /// "METHOD /path" key used for dependency edges and coverage tracking.
    pub fn key(&self) -> String {
        format!("{} {}", self.method, self.path)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthType {
    Bearer,
    Basic,
    Custom,
}

/// Map of all discovered endpoints for an application.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EndpointMap {
    pub app_name: String,
    pub base_url: String,
    #[serde(default)]
    pub endpoints: Vec<Endpoint>,
    #[serde(default)]
    pub auth_patterns: Vec<String>,
    #[serde(default)]
    pub common_headers: BTreeMap<String, String>,
    /// endpoint key → endpoint keys it is inferred to depend on
    #[serde(default)]
    pub dependencies: BTreeMap<String, Vec<String>>,
}

impl EndpointMap {
    pub fn endpoint_count(&self) -> usize {
        self.endpoints.len()
    }

    /// Append-only union by (method, path). Existing entries win; new
    /// endpoints, auth patterns, and dependency edges are added.
    pub fn merge(&mut self, other: &EndpointMap) {
        for endpoint in &other.endpoints {
            let exists = self
                .endpoints
                .iter()
                .any(|e| e.method == endpoint.method && e.path == endpoint.path);
            if !exists {
                self.endpoints.push(endpoint.clone());
            }
        }
        self.endpoints
            .sort_by(|a, b| (a.method.as_str(), a.path.as_str()).cmp(&(b.method.as_str(), b.path.as_str())));

        for pattern in &other.auth_patterns {
            if !self.auth_patterns.contains(pattern) {
                self.auth_patterns.push(pattern.clone());
            }
        }
        self.auth_patterns.sort();

        for (key, deps) in &other.dependencies {
            self.dependencies.entry(key.clone()).or_insert_with(|| deps.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn endpoint(method: &str, path: &str) -> Endpoint {
        Endpoint {
            method: method.to_string(),
            path: path.to_string(),
            description: String::new(),
            request_schema: None,
            response_schema: None,
            auth_required: false,
            auth_type: None,
            query_params: Vec::new(),
            path_params: Vec::new(),
            observed_status_codes: vec![200],
            sample_request: None,
            sample_response: None,
        }
    }

    #[test]
    fn test_merge_is_append_only() {
        let mut base = EndpointMap {
            app_name: "app".to_string(),
            base_url: "http://localhost:5000".to_string(),
            endpoints: vec![endpoint("GET", "/api/users")],
            ..Default::default()
        };
        let mut existing = endpoint("GET", "/api/users");
        existing.observed_status_codes = vec![200, 404];

        let incoming = EndpointMap {
            app_name: "app".to_string(),
            base_url: "http://localhost:5000".to_string(),
            endpoints: vec![existing, endpoint("POST", "/api/users")],
            ..Default::default()
        };

        base.merge(&incoming);
        assert_eq!(base.endpoint_count(), 2);
        // Existing entry keeps its original observation set
        let get = base
            .endpoints
            .iter()
            .find(|e| e.method == "GET")
            .unwrap();
        assert_eq!(get.observed_status_codes, vec![200]);
    }
}
