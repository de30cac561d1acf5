use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use dashboard_api::{
    build_view, filter, initial_selection, project_outcomes, stateless_view, ApiContext,
};
use dataset::Dataset;
use shared::{
    domain::{Outcome, SiteSelection, SliderBounds},
    error::ApiException,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
struct Cli {
    #[arg(long, default_value = "spacex_launch_dash.csv")]
    dataset: String,
    #[arg(long, default_value_t = 10_000.0)]
    slider_max: f64,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Record count, sites, payload extent and per-site outcomes.
    Summary,
    /// Print the dashboard view for one selection as JSON.
    View {
        #[arg(long)]
        site: Option<String>,
        #[arg(long)]
        low: Option<f64>,
        #[arg(long)]
        high: Option<f64>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(log_filter(std::env::var("RUST_LOG").ok().as_deref()))
        .with_writer(std::io::stderr)
        .init();
    let cli = Cli::parse();
    let dataset = Dataset::load(&cli.dataset)
        .await
        .with_context(|| format!("loading dataset '{}'", cli.dataset))?;
    let ctx = ApiContext {
        dataset: Arc::new(dataset),
        slider: SliderBounds {
            max: cli.slider_max,
            ..SliderBounds::default()
        },
    };

    match cli.command {
        Command::Summary => print_summary(&ctx),
        Command::View { site, low, high } => {
            let view = stateless_view(&ctx, site.map(SiteSelection::from), low, high)
                .map_err(ApiException::from)?;
            println!("{}", serde_json::to_string_pretty(&view)?);
        }
    }

    Ok(())
}

fn print_summary(ctx: &ApiContext) {
    let dataset = &ctx.dataset;
    println!("records: {}", dataset.len());
    println!("unknown payload mass: {}", dataset.unknown_payload_count());
    match dataset.payload_extent() {
        Some(extent) => println!("payload extent: {} – {} kg", extent.low(), extent.high()),
        None => println!("payload extent: none"),
    }

    let selection = initial_selection(dataset, &ctx.slider);
    let overall = build_view(dataset, &selection, 0);
    println!(
        "all sites: {} launches, {} success, {} failure",
        overall.outcomes.total(),
        overall.outcomes.count(Outcome::Success),
        overall.outcomes.count(Outcome::Failure)
    );

    for site in dataset.sites() {
        let site = SiteSelection::from(site.as_str());
        let subset = filter(dataset.records(), &site, &selection.payload_range);
        let outcomes = project_outcomes(&subset, &site);
        let ratio = outcomes
            .success_ratio()
            .map_or_else(|| "n/a".to_string(), |r| format!("{:.1}%", r * 100.0));
        println!(
            "  {site}: {} launches, {} success, {} failure, success rate {ratio}",
            outcomes.total(),
            outcomes.count(Outcome::Success),
            outcomes.count(Outcome::Failure)
        );
    }
}

/// `RUST_LOG` directives when they parse, otherwise warnings only.
fn log_filter(directives: Option<&str>) -> EnvFilter {
    directives
        .and_then(|raw| EnvFilter::try_new(raw).ok())
        .unwrap_or_else(|| EnvFilter::new("warn"))
}
