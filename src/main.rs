use postgrest_probe::{
    probe::{default_checklist, run_checklist, ChecklistSummary},
    PostgrestClient, ProbeConfig,
};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = ProbeConfig::load()?;
    tracing::info!(base_url = %config.base_url, "probing");
    let client = PostgrestClient::from_config(&config);

    let reports = run_checklist(&client, default_checklist()).await;
    let summary = ChecklistSummary::from_reports(&reports);
    tracing::info!(
        ok = summary.ok,
        service_errors = summary.service_errors,
        failed = summary.failed,
        "checklist finished"
    );

    Ok(())
}
