pub mod executor;
pub mod flakiness;
pub mod output;
pub mod state;
pub mod workspace;

pub use executor::{ExecutorOutput, TestExecutor};
pub use flakiness::detect_flaky_tests;
pub use state::{ExecutionResult, TestResult, TestStatus};
