use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use forge_tester::generator::gateway::HttpGateway;
use forge_tester::generator::{parse_response, GeneratorInput};
use forge_tester::mapper::types::Exchange;
use forge_tester::pipeline::{run_pipeline, PipelineMode, PipelineRequest};
use forge_tester::runner::{detect_flaky_tests, TestExecutor};
use forge_tester::validator::validate_suite;
use forge_tester::{report, AppContext, Config};

#[derive(Parser)]
#[command(name = "forge-tester")]
#[command(version = "0.1.0")]
#[command(about = "API test generation pipeline from golden examples and observed traffic", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate tests from golden example files
    Generate {
        /// Golden test file(s) or directory
        path: PathBuf,

        /// Target application base URL
        #[arg(short, long, default_value = "http://localhost:5000")]
        base_url: String,

        /// Application name
        #[arg(short, long, default_value = "app")]
        app_name: String,

        /// Application description for the generation prompt
        #[arg(long, default_value = "")]
        description: String,

        /// Number of tests to request
        #[arg(short, long, default_value = "10")]
        num_tests: usize,

        /// Skip executing the generated tests
        #[arg(long, default_value = "false")]
        no_execute: bool,

        /// Keep generated files in this directory instead of a temp dir
        #[arg(short, long)]
        working_dir: Option<PathBuf>,

        /// Write the validation report JSON here
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Generate tests from observed HTTP traffic
    Observe {
        /// JSON file with captured exchanges
        #[arg(short, long)]
        exchanges: Option<PathBuf>,

        /// HAR file to import
        #[arg(long)]
        har: Option<PathBuf>,

        /// Golden test files to borrow style from (combined mode)
        #[arg(short, long)]
        golden: Vec<PathBuf>,

        /// Target application base URL
        #[arg(short, long, default_value = "http://localhost:5000")]
        base_url: String,

        /// Application name
        #[arg(short, long, default_value = "app")]
        app_name: String,

        /// Application description for the generation prompt
        #[arg(long, default_value = "")]
        description: String,

        /// Number of tests to request
        #[arg(short, long, default_value = "10")]
        num_tests: usize,

        /// Skip executing the generated tests
        #[arg(long, default_value = "false")]
        no_execute: bool,

        /// Keep generated files in this directory instead of a temp dir
        #[arg(short, long)]
        working_dir: Option<PathBuf>,

        /// Write the validation report JSON here
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Run a pipeline described by a YAML request file
    Run {
        /// Path to a pipeline request YAML
        request: PathBuf,

        /// Write the validation report JSON here
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Score an existing test suite file
    Validate {
        /// Path to a pytest file
        suite: PathBuf,

        /// Write the validation report JSON here
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Detect flaky tests by running a suite repeatedly
    Flaky {
        /// Path to a pytest file
        suite: PathBuf,

        /// Target application base URL
        #[arg(short, long, default_value = "http://localhost:5000")]
        base_url: String,

        /// Number of runs (defaults to FORGE_FLAKINESS_RUNS or 3)
        #[arg(short, long)]
        runs: Option<u32>,
    },

    /// Render a saved validation report
    Report {
        /// Path to validation results JSON
        results: PathBuf,

        /// Output format (json)
        #[arg(short, long, default_value = "json")]
        format: String,

        /// Output file path
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    let config = Config::from_env();

    match cli.command {
        Commands::Generate {
            path,
            base_url,
            app_name,
            description,
            num_tests,
            no_execute,
            working_dir,
            output,
        } => {
            let golden_files = collect_golden_files(&path)?;
            println!(
                "{} Generating from {} golden file(s)",
                "▶".green().bold(),
                golden_files.len()
            );
            println!("  Base URL: {}", base_url.cyan());

            let mut request = PipelineRequest::new(PipelineMode::Golden);
            request.golden_file_paths = golden_files;
            fill_config(
                &mut request,
                &config,
                &app_name,
                &base_url,
                &description,
                num_tests,
                no_execute,
                working_dir,
            );

            let mut context = AppContext::new(&app_name, &base_url);
            context.apply_to_request(&mut request);

            let gateway = HttpGateway::new(&config);
            let response = run_pipeline(&gateway, &request).await;
            context.absorb_response(&response);
            print_pipeline_response(&response, output.as_deref())?;
        }

        Commands::Observe {
            exchanges,
            har,
            golden,
            base_url,
            app_name,
            description,
            num_tests,
            no_execute,
            working_dir,
            output,
        } => {
            let mode = if golden.is_empty() {
                PipelineMode::Observer
            } else {
                PipelineMode::Combined
            };
            println!(
                "{} Observing traffic ({} mode)",
                "▶".green().bold(),
                mode.label().cyan()
            );

            let mut request = PipelineRequest::new(mode);
            request.golden_file_paths = golden;
            request.har_file_path = har;
            if let Some(path) = exchanges {
                let content = std::fs::read_to_string(&path)?;
                let captured: Vec<Exchange> = serde_json::from_str(&content)?;
                println!("  Exchanges: {}", captured.len().to_string().cyan());
                request.captured_exchanges = captured;
            }
            fill_config(
                &mut request,
                &config,
                &app_name,
                &base_url,
                &description,
                num_tests,
                no_execute,
                working_dir,
            );

            let mut context = AppContext::new(&app_name, &base_url);
            context.apply_to_request(&mut request);

            let gateway = HttpGateway::new(&config);
            let response = run_pipeline(&gateway, &request).await;
            context.absorb_response(&response);
            if !context.untested_endpoints.is_empty() {
                println!(
                    "{} Untested endpoints ({}):",
                    "⚠".yellow().bold(),
                    context.untested_endpoints.len()
                );
                for key in &context.untested_endpoints {
                    println!("  - {}", key.yellow());
                }
            }
            print_pipeline_response(&response, output.as_deref())?;
        }

        Commands::Run { request, output } => {
            let content = std::fs::read_to_string(&request)?;
            let parsed: PipelineRequest = serde_yaml::from_str(&content)?;
            println!(
                "{} Running {} pipeline from {}",
                "▶".green().bold(),
                parsed.mode.label().cyan(),
                request.display()
            );

            let gateway = HttpGateway::new(&config);
            let response = run_pipeline(&gateway, &parsed).await;
            print_pipeline_response(&response, output.as_deref())?;
        }

        Commands::Validate { suite, output } => {
            println!(
                "{} Validating suite: {}",
                "▶".green().bold(),
                suite.display()
            );
            let content = std::fs::read_to_string(&suite)?;
            let parsed = parse_response(&content, &GeneratorInput::new(Default::default()));
            let result = validate_suite(&parsed, None, Vec::new());

            println!("  {}", result.summary.cyan());
            for score in &result.quality_scores {
                let tag = if score.overall_score >= 0.7 {
                    "✓".green()
                } else {
                    "⚠".yellow()
                };
                println!("  {} {} ({:.2})", tag, score.test_name, score.overall_score);
                for issue in &score.issues {
                    println!("      {}", issue.red());
                }
            }
            if output.is_some() {
                report::json::generate(&result, output.as_deref())?;
            }
        }

        Commands::Flaky {
            suite,
            base_url,
            runs,
        } => {
            let runs = runs.unwrap_or(config.flakiness_runs);
            println!(
                "{} Flakiness check: {} run(s) of {}",
                "▶".green().bold(),
                runs,
                suite.display()
            );
            let content = std::fs::read_to_string(&suite)?;
            let parsed = parse_response(&content, &GeneratorInput::new(Default::default()));

            let executor =
                TestExecutor::new(config.python_binary.clone(), config.test_timeout_secs);
            let flaky = detect_flaky_tests(&executor, &parsed, &base_url, runs).await?;

            if flaky.is_empty() {
                println!("{} No flaky tests detected", "✓".green().bold());
            } else {
                println!("{} Flaky tests:", "⚠".yellow().bold());
                for name in &flaky {
                    println!("  - {}", name.yellow());
                }
            }
        }

        Commands::Report {
            results,
            format,
            output,
        } => {
            println!(
                "{} Generating {} report from: {}",
                "▶".green().bold(),
                format.cyan(),
                results.display()
            );
            report::generate_report(&results, &format, output.as_deref())?;
        }
    }

    Ok(())
}

fn collect_golden_files(path: &Path) -> anyhow::Result<Vec<PathBuf>> {
    if path.is_file() {
        return Ok(vec![path.to_path_buf()]);
    }
    let mut files = Vec::new();
    for entry in WalkDir::new(path).into_iter().filter_map(|e| e.ok()) {
        let p = entry.path();
        if p.extension().map_or(false, |ext| ext == "py") {
            files.push(p.to_path_buf());
        }
    }
    files.sort();
    if files.is_empty() {
        anyhow::bail!("No python files found under {}", path.display());
    }
    Ok(files)
}

#[allow(clippy::too_many_arguments)]
fn fill_config(
    request: &mut PipelineRequest,
    config: &Config,
    app_name: &str,
    base_url: &str,
    description: &str,
    num_tests: usize,
    no_execute: bool,
    working_dir: Option<PathBuf>,
) {
    request.config.app_name = app_name.to_string();
    request.config.base_url = base_url.to_string();
    request.config.app_description = description.to_string();
    request.config.num_tests = num_tests;
    request.config.execute_tests = !no_execute;
    request.config.working_dir = working_dir;
    request.config.timeout_secs = config.test_timeout_secs;
    request.config.python_binary = config.python_binary.clone();
}

fn print_pipeline_response(
    response: &forge_tester::PipelineResponse,
    output: Option<&Path>,
) -> anyhow::Result<()> {
    if response.success {
        println!("{} Pipeline complete", "✓".green().bold());
    } else {
        println!("{} Pipeline finished with errors", "✗".red().bold());
        for err in &response.errors {
            println!("  {}", err.red());
        }
    }

    if let Some(map) = &response.endpoint_map {
        println!("  Endpoints mapped: {}", map.endpoint_count().to_string().cyan());
    }
    if let Some(suite) = &response.test_suite {
        println!("  Tests generated: {}", suite.test_count().to_string().cyan());
    }
    if !response.test_file_path.is_empty() {
        println!("  Test file: {}", response.test_file_path.cyan());
    }
    if !response.summary.is_empty() {
        println!("  {}", response.summary.cyan());
    }

    if let (Some(validation), Some(path)) = (&response.validation_result, output) {
        report::json::generate(validation, Some(path))?;
    }

    if !response.success {
        std::process::exit(1);
    }
    Ok(())
}
