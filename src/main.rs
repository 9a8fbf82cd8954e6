use anyhow::Context;
use quire_kernel::settings::Settings;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::load().context("failed to load quire settings")?;
    quire_telemetry::init(&settings.telemetry)?;

    tracing::info!(
        env = ?settings.environment,
        data_dir = ?settings.database.data_dir,
        "quire-app bootstrap starting"
    );

    quire_app::run(settings).await
}
