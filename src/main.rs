use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::{net::SocketAddr, path::PathBuf, sync::Arc};
use tracing::info;

use combine_odds::{
    api::{self, AppState},
    report, summarize, BatchRunner, RequestLimits, SimulationRequest, TierTable,
};

#[derive(Parser, Debug)]
#[command(name = "combine-odds")]
#[command(author, version, about = "Monte Carlo pass-rate estimator for prop firm evaluations")]
struct Args {
    #[command(subcommand)]
    command: Commands,

    /// JSON file with account tiers (defaults to 50K/100K/150K)
    #[arg(long, global = true, env = "COMBINE_ODDS_TIERS_FILE")]
    tiers_file: Option<PathBuf>,

    /// Print verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Simulate a batch of evaluation attempts and print the summary
    Simulate {
        /// Account tier
        #[arg(short, long, default_value = "50K", env = "COMBINE_ODDS_TIER")]
        tier: String,

        /// Number of simulated attempts
        #[arg(short = 'n', long, default_value = "500")]
        sims: usize,

        /// Win rate in percent
        #[arg(short, long, default_value = "55")]
        win_rate: f64,

        /// Dollars risked per trade
        #[arg(short, long, default_value = "300")]
        risk: f64,

        /// Reward:risk ratio
        #[arg(long, default_value = "2.0")]
        rr: f64,

        /// Trades per day
        #[arg(long, default_value = "2")]
        trades_per_day: u32,

        /// Seed for a reproducible batch
        #[arg(long, env = "COMBINE_ODDS_SEED")]
        seed: Option<u64>,

        /// Give up on an attempt after this many days
        #[arg(long)]
        max_days: Option<u32>,

        /// Run attempts on one thread
        #[arg(long)]
        sequential: bool,

        /// Only enforce model validity, not the operator input ranges
        #[arg(long)]
        unbounded: bool,

        /// Print the summary as JSON
        #[arg(long)]
        json: bool,
    },

    /// List the configured account tiers
    Tiers,

    /// Serve the simulation HTTP API
    Serve {
        /// Port to run the web server on
        #[arg(short, long, default_value = "3000", env = "COMBINE_ODDS_PORT")]
        port: u16,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let args = Args::parse();

    let default_level = if args.verbose {
        "combine_odds=debug"
    } else {
        "combine_odds=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(default_level.parse().context("Invalid log directive")?),
        )
        .with_writer(std::io::stderr)
        .init();

    let tiers = match &args.tiers_file {
        Some(path) => TierTable::from_json_file(path)?,
        None => TierTable::default(),
    };

    match args.command {
        Commands::Simulate {
            tier,
            sims,
            win_rate,
            risk,
            rr,
            trades_per_day,
            seed,
            max_days,
            sequential,
            unbounded,
            json,
        } => {
            let request = SimulationRequest {
                tier,
                simulations: sims,
                win_rate_pct: win_rate,
                risk_per_trade: risk,
                reward_risk_ratio: rr,
                trades_per_day,
                seed,
                max_days,
            };
            let limits = if unbounded {
                RequestLimits::unbounded()
            } else {
                RequestLimits::default()
            };
            run_simulate(&tiers, &limits, request, sequential, json)?;
        }
        Commands::Tiers => {
            for tier in tiers.iter() {
                println!(
                    "{:>6}  target ${:.0}  max loss ${:.0}",
                    tier.name, tier.profit_target, tier.max_loss_limit
                );
            }
        }
        Commands::Serve { port } => {
            run_server(tiers, port).await?;
        }
    }

    Ok(())
}

fn run_simulate(
    tiers: &TierTable,
    limits: &RequestLimits,
    request: SimulationRequest,
    sequential: bool,
    json: bool,
) -> Result<()> {
    let (params, n) = request
        .resolve(tiers, limits)
        .context("Invalid simulation settings")?;

    let mut runner = BatchRunner::new().seeded(request.seed);
    if sequential {
        runner = runner.sequential();
    }

    let outcomes = runner.run(&params, n)?;
    let summary = summarize(&outcomes);

    info!(
        "Pass rate {:.1}% over {} attempts on {}",
        summary.pass_rate, summary.simulations, request.tier
    );

    if json {
        let out = serde_json::json!({
            "tier": request.tier,
            "parameters": params,
            "summary": summary,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        print!("{}", report::render(&request.tier, &params, &summary));
    }

    Ok(())
}

async fn run_server(tiers: TierTable, port: u16) -> Result<()> {
    let state = Arc::new(AppState {
        tiers,
        limits: RequestLimits::default(),
    });
    let app = api::router(state);

    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    info!("Listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    axum::serve(listener, app).await?;

    Ok(())
}
