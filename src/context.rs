//! Persistent knowledge about a target application, accumulated across
//! pipeline runs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::mapper::types::EndpointMap;
use crate::pipeline::{PipelineRequest, PipelineResponse};

/// Record of a single pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunRecord {
    pub run_id: String,
    /// "golden", "observer", or "combined"
    pub mode: String,
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub tests_generated: usize,
    #[serde(default)]
    pub tests_passed: usize,
    #[serde(default)]
    pub tests_failed: usize,
    #[serde(default)]
    pub endpoints_tested: Vec<String>,
    /// Endpoints tested for the first time in this run
    #[serde(default)]
    pub new_coverage: Vec<String>,
    #[serde(default)]
    pub issues_found: Vec<String>,
}

/// Accumulated knowledge about one application: discovered endpoints,
/// learned conventions, coverage, run history.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppContext {
    pub app_id: String,
    pub app_name: String,
    pub base_url: String,
    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub endpoint_map: Option<EndpointMap>,

    #[serde(default)]
    pub known_fixtures: Vec<String>,
    /// Names of previously generated tests, so new runs avoid duplicates
    #[serde(default)]
    pub known_test_names: Vec<String>,

    /// "METHOD /path" keys
    #[serde(default)]
    pub tested_endpoints: Vec<String>,
    #[serde(default)]
    pub untested_endpoints: Vec<String>,
    #[serde(default)]
    pub coverage_gaps: Vec<String>,

    #[serde(default)]
    pub total_tests_generated: usize,
    #[serde(default)]
    pub total_tests_passed: usize,
    #[serde(default)]
    pub total_tests_failed: usize,
    #[serde(default)]
    pub run_history: Vec<RunRecord>,

    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

impl AppContext {
    pub fn new(app_name: &str, base_url: &str) -> Self {
        let now = Utc::now();
        Self {
            app_id: uuid::Uuid::new_v4().simple().to_string()[..12].to_string(),
            app_name: app_name.to_string(),
            base_url: base_url.to_string(),
            description: String::new(),
            endpoint_map: None,
            known_fixtures: Vec::new(),
            known_test_names: Vec::new(),
            tested_endpoints: Vec::new(),
            untested_endpoints: Vec::new(),
            coverage_gaps: Vec::new(),
            total_tests_generated: 0,
            total_tests_passed: 0,
            total_tests_failed: 0,
            run_history: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Fold a newly discovered endpoint map into the accumulated one.
    /// Existing endpoints win; untested coverage is recomputed.
    pub fn absorb_endpoint_map(&mut self, new_map: &EndpointMap) {
        match &mut self.endpoint_map {
            Some(existing) => existing.merge(new_map),
            None => self.endpoint_map = Some(new_map.clone()),
        }
        self.recompute_untested();
        self.updated_at = Utc::now();
    }

    /// Record one completed run and fold its coverage in.
    pub fn record_run(&mut self, record: RunRecord) {
        self.total_tests_generated += record.tests_generated;
        self.total_tests_passed += record.tests_passed;
        self.total_tests_failed += record.tests_failed;

        for key in &record.endpoints_tested {
            if !self.tested_endpoints.contains(key) {
                self.tested_endpoints.push(key.clone());
            }
        }
        self.recompute_untested();
        self.run_history.push(record);
        self.updated_at = Utc::now();
    }

    pub fn note_test_names(&mut self, names: impl IntoIterator<Item = String>) {
        for name in names {
            if !self.known_test_names.contains(&name) {
                self.known_test_names.push(name);
            }
        }
    }

    /// Feed accumulated coverage into a pipeline request so generation
    /// avoids duplicate names and targets the gaps.
    pub fn apply_to_request(&self, request: &mut PipelineRequest) {
        request.tested_endpoints = self.tested_endpoints.clone();
        request.untested_endpoints = self.untested_endpoints.clone();
        request.coverage_gaps = self.coverage_gaps.clone();
        request.known_test_names = self.known_test_names.clone();
    }

    /// Fold a finished pipeline response back into the context: merge the
    /// discovered endpoint map, remember generated test names, and record
    /// the run.
    pub fn absorb_response(&mut self, response: &PipelineResponse) {
        if let Some(map) = &response.endpoint_map {
            self.absorb_endpoint_map(map);
        }

        let mut record = RunRecord {
            run_id: uuid::Uuid::new_v4().simple().to_string()[..12].to_string(),
            mode: response.mode.label().to_string(),
            timestamp: Utc::now(),
            tests_generated: 0,
            tests_passed: 0,
            tests_failed: 0,
            endpoints_tested: Vec::new(),
            new_coverage: Vec::new(),
            issues_found: Vec::new(),
        };

        if let Some(suite) = &response.test_suite {
            record.tests_generated = suite.test_count();
            self.note_test_names(suite.tests.iter().map(|t| t.name.clone()));
            for test in &suite.tests {
                if let (Some(method), Some(endpoint)) =
                    (&test.target_method, &test.target_endpoint)
                {
                    let key = format!("{} {}", method, endpoint);
                    if !record.endpoints_tested.contains(&key) {
                        if !self.tested_endpoints.contains(&key) {
                            record.new_coverage.push(key.clone());
                        }
                        record.endpoints_tested.push(key);
                    }
                }
            }
        }
        if let Some(execution) = &response.execution_result {
            record.tests_passed = execution.passed();
            record.tests_failed = execution.failed();
        }
        if let Some(validation) = &response.validation_result {
            for score in &validation.quality_scores {
                record.issues_found.extend(score.issues.iter().cloned());
            }
        }

        self.record_run(record);
    }

    fn recompute_untested(&mut self) {
        let Some(map) = &self.endpoint_map else {
            return;
        };
        self.untested_endpoints = map
            .endpoints
            .iter()
            .map(|ep| ep.key())
            .filter(|key| !self.tested_endpoints.contains(key))
            .collect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapper::types::Endpoint;

    fn map_with(paths: &[(&str, &str)]) -> EndpointMap {
        EndpointMap {
            app_name: "app".to_string(),
            base_url: "http://localhost:5000".to_string(),
            endpoints: paths
                .iter()
                .map(|(method, path)| Endpoint {
                    method: method.to_string(),
                    path: path.to_string(),
                    ..empty_endpoint()
                })
                .collect(),
            auth_patterns: Vec::new(),
            common_headers: Default::default(),
            dependencies: Default::default(),
        }
    }

    fn empty_endpoint() -> Endpoint {
        Endpoint {
            method: String::new(),
            path: String::new(),
            description: String::new(),
            request_schema: None,
            response_schema: None,
            auth_required: false,
            auth_type: None,
            query_params: Vec::new(),
            path_params: Vec::new(),
            observed_status_codes: Vec::new(),
            sample_request: None,
            sample_response: None,
        }
    }

    #[test]
    fn test_absorb_merges_and_tracks_untested() {
        let mut ctx = AppContext::new("app", "http://localhost:5000");
        ctx.absorb_endpoint_map(&map_with(&[("GET", "/api/users")]));
        assert_eq!(ctx.untested_endpoints, vec!["GET /api/users"]);

        ctx.absorb_endpoint_map(&map_with(&[("GET", "/api/users"), ("POST", "/api/users")]));
        let map = ctx.endpoint_map.as_ref().unwrap();
        assert_eq!(map.endpoints.len(), 2);
        assert_eq!(ctx.untested_endpoints.len(), 2);
    }

    #[test]
    fn test_record_run_updates_coverage() {
        let mut ctx = AppContext::new("app", "http://localhost:5000");
        ctx.absorb_endpoint_map(&map_with(&[("GET", "/api/users"), ("POST", "/api/users")]));

        ctx.record_run(RunRecord {
            run_id: "r1".to_string(),
            mode: "golden".to_string(),
            timestamp: Utc::now(),
            tests_generated: 5,
            tests_passed: 4,
            tests_failed: 1,
            endpoints_tested: vec!["GET /api/users".to_string()],
            new_coverage: Vec::new(),
            issues_found: Vec::new(),
        });

        assert_eq!(ctx.total_tests_generated, 5);
        assert_eq!(ctx.tested_endpoints, vec!["GET /api/users"]);
        assert_eq!(ctx.untested_endpoints, vec!["POST /api/users"]);
        assert_eq!(ctx.run_history.len(), 1);
    }

    #[test]
    fn test_absorb_response_feeds_next_request() {
        use crate::generator::{CandidateTest, TestSuite};
        use crate::pipeline::PipelineMode;

        let suite = TestSuite {
            name: "suite".to_string(),
            tests: vec![CandidateTest {
                id: "1".to_string(),
                name: "test_list_users".to_string(),
                source_code: "def test_list_users():\n    assert True".to_string(),
                test_category: "api".to_string(),
                target_endpoint: Some("/api/users".to_string()),
                target_method: Some("GET".to_string()),
            }],
            ..Default::default()
        };
        let response = PipelineResponse {
            mode: PipelineMode::Observer,
            success: true,
            errors: Vec::new(),
            test_file_path: String::new(),
            summary: String::new(),
            endpoint_map: Some(map_with(&[("GET", "/api/users"), ("POST", "/api/users")])),
            test_suite: Some(suite),
            execution_result: None,
            validation_result: None,
            raw_llm_response: String::new(),
        };

        let mut ctx = AppContext::new("app", "http://localhost:5000");
        ctx.absorb_response(&response);

        assert_eq!(ctx.tested_endpoints, vec!["GET /api/users"]);
        assert_eq!(ctx.untested_endpoints, vec!["POST /api/users"]);
        assert_eq!(ctx.known_test_names, vec!["test_list_users"]);
        assert_eq!(ctx.run_history.len(), 1);
        assert_eq!(ctx.run_history[0].new_coverage, vec!["GET /api/users"]);

        let mut next = PipelineRequest::new(PipelineMode::Observer);
        ctx.apply_to_request(&mut next);
        assert_eq!(next.untested_endpoints, vec!["POST /api/users"]);
        assert_eq!(next.known_test_names, vec!["test_list_users"]);
    }

    #[test]
    fn test_known_test_names_deduplicated() {
        let mut ctx = AppContext::new("app", "http://localhost:5000");
        ctx.note_test_names(["test_a".to_string(), "test_a".to_string(), "test_b".to_string()]);
        assert_eq!(ctx.known_test_names, vec!["test_a", "test_b"]);
    }
}
