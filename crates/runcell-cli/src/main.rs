//! Runcell CLI
//!
//! Runs a source file once or against test cases, or serves the same engine over HTTP.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use runcell::{
    COMPILE_TIMEOUT, Config, EXAMPLE_CONFIG, ExecutionRequest, ExecutionResponse,
    LanguageRegistry, PathLocator, RUN_TIMEOUT, Runner, TestCase, ToolchainLocator,
};
use tracing::{Level, debug, info};
use tracing_subscriber::EnvFilter;

mod server;

#[derive(Parser)]
#[command(name = "runcell")]
#[command(about = "Compile and run untrusted code against test cases")]
#[command(version)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a new configuration file
    Init {
        /// Output path (default: runcell.toml)
        #[arg(short, long, default_value = "runcell.toml")]
        output: PathBuf,

        /// Overwrite existing file
        #[arg(short, long)]
        force: bool,
    },

    /// Run a program (compile if needed, then execute)
    Run {
        /// Source file to run
        #[arg(value_name = "FILE")]
        source: PathBuf,

        /// Language ID (e.g., cpp, python)
        #[arg(short, long)]
        language: String,

        /// Input file fed to the program's stdin
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// JSON file with test cases: [{"input": "...", "expectedOutput": "..."}]
        #[arg(short, long)]
        tests: Option<PathBuf>,
    },

    /// List available languages
    Languages,

    /// Show effective configuration
    ShowConfig,

    /// Serve the execution API over HTTP
    Serve {
        /// Address to listen on (overrides server.bind)
        #[arg(short, long)]
        bind: Option<SocketAddr>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::from_default_env().add_directive(Level::DEBUG.into())
    } else {
        EnvFilter::from_default_env().add_directive(Level::INFO.into())
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config_path = cli.config.as_deref();
    match cli.command {
        Commands::Init { output, force } => init_config(&output, force).await,
        Commands::Run {
            source,
            language,
            input,
            tests,
        } => {
            let config = load_config(config_path)?;
            run_execute(&config, &source, &language, input.as_deref(), tests.as_deref()).await
        }
        Commands::Languages => {
            list_languages();
            Ok(())
        }
        Commands::ShowConfig => {
            show_config(&load_config(config_path)?);
            Ok(())
        }
        Commands::Serve { bind } => {
            let config = load_config(config_path)?;
            let bind = bind.unwrap_or(config.server.bind);
            server::serve(Runner::new(&config), bind).await
        }
    }
}

/// Load the config file (if any), then apply `RUNCELL_*` environment overrides
fn load_config(path: Option<&Path>) -> Result<Config> {
    if let Some(path) = path {
        info!(?path, "loading configuration");
    } else {
        debug!("using default configuration");
    }
    Config::load(path).context("failed to load configuration")
}

async fn run_execute(
    config: &Config,
    source: &Path,
    language: &str,
    input: Option<&Path>,
    tests: Option<&Path>,
) -> Result<()> {
    let code = tokio::fs::read_to_string(source)
        .await
        .context("failed to read source file")?;

    let mut request = ExecutionRequest::new(code, language);
    if let Some(input_path) = input {
        let input = tokio::fs::read_to_string(input_path)
            .await
            .context("failed to read input file")?;
        request = request.with_input(input);
    }
    if let Some(tests_path) = tests {
        let content = tokio::fs::read_to_string(tests_path)
            .await
            .context("failed to read test case file")?;
        let cases: Vec<TestCase> =
            serde_json::from_str(&content).context("failed to parse test case file")?;
        request = request.with_test_cases(cases);
    }

    info!(language, "running program");
    let runner = Runner::new(config);
    let response = runner.execute(request).await?;
    let success = response.is_success();

    match response {
        ExecutionResponse::Freeform(result) => {
            if !result.output.is_empty() {
                println!("{}", result.output);
            }
            if !result.error.is_empty() {
                eprintln!("{}", result.error);
            }
            // Keep stdout clean for piping
            info!(
                status = %result.status,
                time = format_args!("{}ms", result.execution_time),
                exit_code = result.exit_code,
                "execution result"
            );
        }
        ExecutionResponse::CompilationFailed(failure) => {
            eprintln!("Compilation failed:");
            eprintln!("{}", failure.details);
        }
        report @ ExecutionResponse::TestCases(_) => {
            let json = serde_json::to_string_pretty(&report).context("failed to encode report")?;
            println!("{json}");
        }
    }

    if success {
        Ok(())
    } else {
        std::process::exit(1);
    }
}

fn list_languages() {
    println!("Available languages:\n");

    let locator = PathLocator;
    for lang in LanguageRegistry::builtin().iter() {
        let lang_type = if lang.is_compiled() {
            "compiled"
        } else {
            "interpreted"
        };
        let availability = if locator.is_available(lang) {
            ""
        } else {
            " [toolchain missing]"
        };
        println!("  {:<15} {} ({}){}", lang.id, lang.name, lang_type, availability);
    }
}

fn show_config(config: &Config) {
    println!("Workspace root: {}", config.workspace_root.display());
    println!("Max concurrent executions: {}", config.max_concurrent_executions);
    println!("Max output bytes: {}", config.max_output_bytes);
    println!("Server bind: {}", config.server.bind);
    println!();
    println!("Run timeout: {}s", RUN_TIMEOUT.as_secs());
    println!("Compile timeout: {}s", COMPILE_TIMEOUT.as_secs());
    println!();
    println!("Languages configured: {}", LanguageRegistry::builtin().len());
}

async fn init_config(output: &Path, force: bool) -> Result<()> {
    if output.exists() && !force {
        anyhow::bail!(
            "Configuration file already exists at '{}'. Use --force to overwrite.",
            output.display()
        );
    }

    tokio::fs::write(output, EXAMPLE_CONFIG)
        .await
        .context("failed to write configuration file")?;

    println!("Created configuration file at '{}'", output.display());
    Ok(())
}
