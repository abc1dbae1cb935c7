pub mod analyzer;
pub mod context;
pub mod generator;
pub mod mapper;
pub mod pipeline;
pub mod report;
pub mod runner;
pub mod utils;
pub mod validator;

// Re-export common items
pub use context::AppContext;
pub use pipeline::{run_pipeline, PipelineMode, PipelineRequest, PipelineResponse};
pub use report::generate_report;
pub use utils::Config;
