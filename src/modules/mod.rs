pub mod auth;
pub mod books;
pub mod users;

use std::sync::Arc;

use quire_kernel::ModuleRegistry;

use crate::state::AppState;

/// Register every feature module, all sharing one state.
pub fn register_all(registry: &mut ModuleRegistry, state: &AppState) -> anyhow::Result<()> {
    registry.register(Arc::new(books::BooksModule::new(state.clone())))?;
    registry.register(Arc::new(auth::AuthModule::new(state.clone())))?;
    registry.register(Arc::new(users::UsersModule::new(state.clone())))?;
    Ok(())
}
