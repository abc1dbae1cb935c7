/// Application configuration, threaded explicitly through the pipeline and
/// component constructors.
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of an OpenAI-compatible chat completions endpoint
    pub llm_base_url: String,

    /// Model name passed to the generation service
    pub llm_model: String,

    /// API key, empty when the endpoint is unauthenticated (e.g. local ollama)
    pub llm_api_key: String,

    /// Sampling temperature for generation requests
    pub llm_temperature: f64,

    /// Token cap for generation responses
    pub llm_max_tokens: u32,

    /// Timeout for one test suite execution (seconds)
    pub test_timeout_secs: u64,

    /// Override for the python interpreter used to run pytest
    pub python_binary: Option<String>,

    /// Number of executor runs for flakiness detection
    pub flakiness_runs: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            llm_base_url: "https://api.openai.com/v1".to_string(),
            llm_model: "gpt-4o".to_string(),
            llm_api_key: String::new(),
            llm_temperature: 0.2,
            llm_max_tokens: 4096,
            test_timeout_secs: 60,
            python_binary: None,
            flakiness_runs: 3,
        }
    }
}

impl Config {
    /// Build a config from FORGE_* environment variables over defaults.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(url) = std::env::var("FORGE_LLM_BASE_URL") {
            config.llm_base_url = url;
        }
        if let Ok(model) = std::env::var("FORGE_LLM_MODEL") {
            config.llm_model = model;
        }
        if let Ok(key) = std::env::var("FORGE_LLM_API_KEY") {
            config.llm_api_key = key;
        }
        if let Ok(temperature) = std::env::var("FORGE_LLM_TEMPERATURE") {
            if let Ok(t) = temperature.parse() {
                config.llm_temperature = t;
            }
        }
        if let Ok(max_tokens) = std::env::var("FORGE_LLM_MAX_TOKENS") {
            if let Ok(n) = max_tokens.parse() {
                config.llm_max_tokens = n;
            }
        }
        if let Ok(timeout) = std::env::var("FORGE_TEST_TIMEOUT_SECS") {
            if let Ok(secs) = timeout.parse() {
                config.test_timeout_secs = secs;
            }
        }
        if let Ok(python) = std::env::var("FORGE_PYTHON") {
            config.python_binary = Some(python);
        }
        if let Ok(runs) = std::env::var("FORGE_FLAKINESS_RUNS") {
            if let Ok(n) = runs.parse() {
                config.flakiness_runs = n;
            }
        }
        config
    }
}
