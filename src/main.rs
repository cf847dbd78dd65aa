//! score_token - score one token and print the JSON report
//!
//! Endpoints and timeouts come from the environment (see `EngineConfig::from_env`).
//! Logs go to stderr, the report to stdout. The exit code reflects the error category.

use token_score::providers::encode_submit_score;
use token_score::utils::constants::{APP_NAME, APP_VERSION, DEFAULT_FETCH_LIMIT};
use token_score::{AnalysisOptions, AppError, EngineConfig, ScoringEngine};

use clap::Parser;
use eyre::Result;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser, Debug)]
#[command(name = "score_token", version, about = "Token risk scoring engine")]
struct Cli {
    /// Token contract address (0x + 40 hex digits)
    token: String,

    /// Holder / transfer page budget
    #[arg(
        long,
        default_value_t = DEFAULT_FETCH_LIMIT as u64,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    limit: u64,

    /// Paginate holders until exhausted
    #[arg(long)]
    all: bool,

    /// Only consider transfers from the last N hours
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    window_hours: Option<u64>,

    /// Add ABI calldata for the score registry to the output
    #[arg(long)]
    submit_calldata: bool,
}

impl Cli {
    fn options(&self) -> AnalysisOptions {
        AnalysisOptions {
            limit: self.limit as usize,
            fetch_all: self.all,
            window_hours: self.window_hours,
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .init();
}

async fn run(cli: Cli) -> std::result::Result<(), AppError> {
    let config = EngineConfig::from_env()?;
    info!(rpc = %config.masked_rpc_url(), "📡 Using RPC endpoint");

    let engine = ScoringEngine::from_config(&config)?;
    let report = engine.analyze(&cli.token, cli.options()).await?;

    let mut output = serde_json::to_value(&report)?;
    if cli.submit_calldata {
        let calldata = encode_submit_score(&report.submit_data);
        output["submit_calldata"] = serde_json::Value::String(calldata.to_string());
    }
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Usage errors exit with 2
    let cli = Cli::parse();

    init_tracing();
    info!("🚀 {} v{}", APP_NAME, APP_VERSION);

    if let Err(e) = run(cli).await {
        error!(code = e.code_str(), "❌ {}", e);
        std::process::exit(e.code.exit_code());
    }
    Ok(())
}
