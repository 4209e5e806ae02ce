use chrono::Local;
use dotenvy::dotenv;
use eyre::WrapErr;
use tracing::{info, instrument};

use capm_dashboard::config::Config;
use capm_dashboard::logging;
use capm_dashboard::pipeline::run_from_config;
use capm_dashboard::report::{self, DashboardOptions};

#[instrument(name = "capm_dashboard_main")]
#[tokio::main]
async fn main() -> eyre::Result<()> {
    // Load environment variables from .env file
    dotenv().ok();

    // Initialize logging
    if let Err(e) = logging::init_logging(env!("CARGO_BIN_NAME")) {
        eprintln!("Failed to initialize logging: {}", e);
        return Err(e);
    }

    let cfg = Config::load()?;
    info!(
        data_source = ?cfg.data_source,
        market = %cfg.market_index.display_name,
        output_dir = %cfg.output_dir.display(),
        "Configuration loaded and logging initialized"
    );

    let output = run_from_config(&cfg, Local::now().date_naive())
        .await
        .wrap_err("Pipeline run failed")?;

    report::log_performance_table(&output.report);

    let dashboard_path = cfg.output_dir.join("capm_dashboard.html");
    let options = DashboardOptions::default()
        .with_title(format!("CAPM Dashboard vs {}", cfg.market_index.display_name))
        .with_output(&dashboard_path);
    report::render_dashboard(&output.report, &output.prices, &options)
        .wrap_err_with(|| format!("Failed to write dashboard to {}", dashboard_path.display()))?;

    report::write_report_json(&output.report, &cfg.output_dir.join("capm_report.json"))
        .wrap_err("Failed to write report JSON")?;
    report::write_table_csv(&output.report.normalized, &cfg.output_dir.join("normalized_prices.csv"))
        .wrap_err("Failed to write normalized prices")?;
    report::write_table_csv(&output.report.cumulative, &cfg.output_dir.join("cumulative_returns.csv"))
        .wrap_err("Failed to write cumulative returns")?;

    info!(dashboard = %dashboard_path.display(), "Run complete");
    Ok(())
}
