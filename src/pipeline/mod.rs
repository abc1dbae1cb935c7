//! Pipeline orchestration: golden, observer, and combined flows.

use std::path::PathBuf;

use log::{error, info};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::analyzer::{self, AnalyzerInput, StyleModel};
use crate::generator::{self, gateway::LlmGateway, GeneratorInput, TestSuite};
use crate::mapper::har::parse_har_file;
use crate::mapper::types::{EndpointMap, Exchange, TrafficRecord};
use crate::mapper::EndpointMapper;
use crate::runner::{ExecutionResult, TestExecutor};
use crate::validator::{validate_suite, ValidationResult};

/// Stage-tagged pipeline failure.
#[derive(Debug, Error)]
pub enum StageError {
    #[error("Analyzer failed: {0}")]
    Analyzer(String),
    #[error("Observer failed: {0}")]
    Observer(String),
    #[error("Mapper failed: {0}")]
    Mapper(String),
    #[error("Generator failed: {0}")]
    Generator(String),
    #[error("Executor failed: {0}")]
    Executor(String),
    #[error("Validator failed: {0}")]
    Validator(String),
}

/// Which pipeline to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PipelineMode {
    Golden,
    Observer,
    Combined,
}

impl PipelineMode {
    pub fn label(&self) -> &'static str {
        match self {
            PipelineMode::Golden => "golden",
            PipelineMode::Observer => "observer",
            PipelineMode::Combined => "combined",
        }
    }
}

/// Shared knobs for a pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PipelineConfig {
    pub app_name: String,
    pub base_url: String,
    pub app_description: String,
    pub num_tests: usize,
    pub execute_tests: bool,
    pub working_dir: Option<PathBuf>,
    pub timeout_secs: u64,
    pub python_binary: Option<String>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            app_name: "app".to_string(),
            base_url: "http://localhost:5000".to_string(),
            app_description: String::new(),
            num_tests: 10,
            execute_tests: true,
            working_dir: None,
            timeout_secs: 60,
            python_binary: None,
        }
    }
}

/// Unified request for any pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineRequest {
    pub mode: PipelineMode,

    // golden inputs
    #[serde(default)]
    pub golden_file_paths: Vec<PathBuf>,
    #[serde(default)]
    pub golden_sources: Vec<String>,

    // observer inputs
    #[serde(default)]
    pub captured_exchanges: Vec<Exchange>,
    #[serde(default)]
    pub har_file_path: Option<PathBuf>,

    #[serde(default)]
    pub config: PipelineConfig,

    // prior-coverage context for generation
    #[serde(default)]
    pub tested_endpoints: Vec<String>,
    #[serde(default)]
    pub untested_endpoints: Vec<String>,
    #[serde(default)]
    pub coverage_gaps: Vec<String>,
    #[serde(default)]
    pub known_test_names: Vec<String>,
}

impl PipelineRequest {
    pub fn new(mode: PipelineMode) -> Self {
        Self {
            mode,
            golden_file_paths: Vec::new(),
            golden_sources: Vec::new(),
            captured_exchanges: Vec::new(),
            har_file_path: None,
            config: PipelineConfig::default(),
            tested_endpoints: Vec::new(),
            untested_endpoints: Vec::new(),
            coverage_gaps: Vec::new(),
            known_test_names: Vec::new(),
        }
    }
}

/// Unified response from any pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineResponse {
    pub mode: PipelineMode,
    pub success: bool,
    #[serde(default)]
    pub errors: Vec<String>,
    #[serde(default)]
    pub test_file_path: String,
    #[serde(default)]
    pub summary: String,

    #[serde(default)]
    pub endpoint_map: Option<EndpointMap>,
    #[serde(default)]
    pub test_suite: Option<TestSuite>,
    #[serde(default)]
    pub execution_result: Option<ExecutionResult>,
    #[serde(default)]
    pub validation_result: Option<ValidationResult>,
    #[serde(default)]
    pub raw_llm_response: String,
}

impl PipelineResponse {
    fn empty(mode: PipelineMode) -> Self {
        Self {
            mode,
            success: false,
            errors: Vec::new(),
            test_file_path: String::new(),
            summary: String::new(),
            endpoint_map: None,
            test_suite: None,
            execution_result: None,
            validation_result: None,
            raw_llm_response: String::new(),
        }
    }

    fn fail(&mut self, err: StageError) {
        error!("{}", err);
        self.errors.push(err.to_string());
    }

    fn finish(&mut self) {
        self.success = self.test_suite.is_some() && self.errors.is_empty();
        if let Some(validation) = &self.validation_result {
            self.summary = validation.summary.clone();
        }
    }
}

/// Run the requested pipeline end to end.
pub async fn run_pipeline(gateway: &dyn LlmGateway, request: &PipelineRequest) -> PipelineResponse {
    match request.mode {
        PipelineMode::Golden => run_golden(gateway, request, None).await,
        PipelineMode::Observer => run_observer(gateway, request, None).await,
        PipelineMode::Combined => run_combined(gateway, request).await,
    }
}

/// Analyzer → Generator → Executor → Validator.
async fn run_golden(
    gateway: &dyn LlmGateway,
    request: &PipelineRequest,
    endpoint_map: Option<EndpointMap>,
) -> PipelineResponse {
    let mut response = PipelineResponse::empty(PipelineMode::Golden);
    response.endpoint_map = endpoint_map;

    info!("Step 1/4: Analyzing golden examples...");
    let style = match analyze_goldens(request) {
        Ok(style) => style,
        Err(err) => {
            response.fail(err);
            return response;
        }
    };

    info!("Step 2/4: Generating tests...");
    if let Err(err) = generate_into(gateway, request, style, &mut response).await {
        response.fail(err);
        return response;
    }

    execute_and_validate(request, &mut response, 3, 4).await;
    response.finish();
    response
}

/// Traffic → Mapper → Generator → Executor → Validator.
async fn run_observer(
    gateway: &dyn LlmGateway,
    request: &PipelineRequest,
    golden_style: Option<StyleModel>,
) -> PipelineResponse {
    let mode = if golden_style.is_some() {
        PipelineMode::Combined
    } else {
        PipelineMode::Observer
    };
    let mut response = PipelineResponse::empty(mode);

    info!("Step 1/5: Collecting HTTP traffic...");
    let record = match collect_traffic(request) {
        Ok(record) => record,
        Err(err) => {
            response.fail(err);
            return response;
        }
    };
    if record.exchanges.is_empty() {
        response.errors.push("No HTTP exchanges captured".to_string());
        return response;
    }
    info!("Collected {} exchanges", record.exchanges.len());

    info!("Step 2/5: Mapping endpoints...");
    let mapper = EndpointMapper::new();
    match mapper.map_traffic(&record) {
        Ok(map) => {
            info!("Mapped {} endpoints", map.endpoint_count());
            response.endpoint_map = Some(map);
        }
        Err(err) => {
            response.fail(StageError::Mapper(err.to_string()));
            return response;
        }
    }

    info!("Step 3/5: Generating tests...");
    let style = golden_style.unwrap_or_default();
    if let Err(err) = generate_into(gateway, request, style, &mut response).await {
        response.fail(err);
        return response;
    }

    execute_and_validate(request, &mut response, 4, 5).await;
    response.finish();
    response
}

/// Golden analysis first (style only), then the observer flow with
/// that style.
async fn run_combined(gateway: &dyn LlmGateway, request: &PipelineRequest) -> PipelineResponse {
    let style = if request.golden_file_paths.is_empty() && request.golden_sources.is_empty() {
        None
    } else {
        match analyze_goldens(request) {
            Ok(style) => Some(style),
            Err(err) => {
                let mut response = PipelineResponse::empty(PipelineMode::Combined);
                response.fail(err);
                return response;
            }
        }
    };
    run_observer(gateway, request, Some(style.unwrap_or_default())).await
}

fn analyze_goldens(request: &PipelineRequest) -> Result<StyleModel, StageError> {
    let input = AnalyzerInput {
        golden_file_paths: request.golden_file_paths.clone(),
        golden_sources: request.golden_sources.clone(),
    };
    let style = analyzer::analyze(&input).map_err(|e| StageError::Analyzer(e.to_string()))?;
    info!(
        "Analyzed {} golden examples, found {} test patterns",
        style.golden_examples.len(),
        style
            .golden_examples
            .iter()
            .map(|ex| ex.test_functions.len())
            .sum::<usize>()
    );
    Ok(style)
}

fn collect_traffic(request: &PipelineRequest) -> Result<TrafficRecord, StageError> {
    let mut record = TrafficRecord::new(&request.config.app_name, &request.config.base_url);
    record.exchanges = request.captured_exchanges.clone();

    if let Some(har_path) = &request.har_file_path {
        let imported =
            parse_har_file(har_path).map_err(|e| StageError::Observer(e.to_string()))?;
        record.exchanges.extend(imported);
    }
    Ok(record)
}

async fn generate_into(
    gateway: &dyn LlmGateway,
    request: &PipelineRequest,
    style: StyleModel,
    response: &mut PipelineResponse,
) -> Result<(), StageError> {
    let mut input = GeneratorInput::new(style);
    input.endpoint_map = response.endpoint_map.clone();
    input.app_description = if request.config.app_description.is_empty() {
        request.config.app_name.clone()
    } else {
        request.config.app_description.clone()
    };
    input.base_url = request.config.base_url.clone();
    input.num_tests = request.config.num_tests;
    input.tested_endpoints = request.tested_endpoints.clone();
    input.untested_endpoints = request.untested_endpoints.clone();
    input.coverage_gaps = request.coverage_gaps.clone();
    input.known_test_names = request.known_test_names.clone();

    let output = generator::generate(gateway, &input)
        .await
        .map_err(|e| StageError::Generator(e.to_string()))?;
    info!("Generated {} tests", output.test_suite.test_count());
    response.test_suite = Some(output.test_suite);
    response.raw_llm_response = output.raw_llm_response;
    Ok(())
}

/// Executor and validator stages. Failures here degrade the response
/// instead of aborting it.
async fn execute_and_validate(
    request: &PipelineRequest,
    response: &mut PipelineResponse,
    step: usize,
    total: usize,
) {
    let Some(suite) = response.test_suite.clone() else {
        return;
    };

    if request.config.execute_tests {
        info!("Step {}/{}: Executing tests...", step, total);
        let executor = TestExecutor::new(
            request.config.python_binary.clone(),
            request.config.timeout_secs,
        );
        match executor
            .run_suite(
                &suite,
                &request.config.base_url,
                request.config.working_dir.as_deref(),
            )
            .await
        {
            Ok(output) => {
                info!(
                    "Execution: {} passed, {} failed out of {}",
                    output.execution_result.passed(),
                    output.execution_result.failed(),
                    output.execution_result.test_results.len()
                );
                response.test_file_path = output.test_file_path;
                response.execution_result = Some(output.execution_result);
            }
            Err(err) => response.fail(StageError::Executor(err.to_string())),
        }
    } else {
        info!("Step {}/{}: Skipping test execution", step, total);
    }

    info!("Step {}/{}: Validating tests...", step + 1, total);
    let validation = validate_suite(&suite, response.execution_result.clone(), Vec::new());
    info!("Validation: {}", validation.summary);
    response.validation_result = Some(validation);
}
