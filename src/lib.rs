//! Quire bookstore application: catalogue, reviews and accounts mounted on
//! the quire kernel and HTTP facade.

pub mod modules;
pub mod state;
pub mod utils;

use anyhow::Context;
use axum::Router;

use quire_db::Database;
use quire_kernel::{settings::Settings, InitCtx, ModuleRegistry};

pub use state::AppState;

/// Registry holding every feature module over `state`.
pub fn build_registry(state: &AppState) -> anyhow::Result<ModuleRegistry> {
    let mut registry = ModuleRegistry::new();
    modules::register_all(&mut registry, state)?;
    Ok(registry)
}

/// The complete HTTP application without binding a socket.
pub fn router(state: &AppState, settings: &Settings) -> anyhow::Result<Router> {
    let registry = build_registry(state)?;
    Ok(quire_http::build_router(&registry, settings))
}

/// Open storage, run the module lifecycle and serve until shutdown.
pub async fn run(settings: Settings) -> anyhow::Result<()> {
    let db = Database::connect(&settings.database);
    if !db.is_persistent() {
        tracing::warn!("database.data_dir is not set, data will be lost on exit");
    }

    let state = AppState::open(&db, &settings.auth)
        .await
        .context("failed to open collections")?;
    let registry = build_registry(&state)?;

    let ctx = InitCtx {
        settings: &settings,
    };
    registry.init_all(&ctx).await?;
    registry.start_all(&ctx).await?;

    let served = quire_http::start_server(&registry, &settings).await;
    registry.stop_all().await?;
    served
}
