use std::sync::Arc;

use participant_manager::db::PgStore;
use participant_manager::settings::{ENV_PREFIX, Settings};
use participant_manager::{AppState, router};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let env_file = common::load_dotenv();
    let settings: Settings = common::load_settings("participant-manager", ENV_PREFIX)?;
    common::init_tracing(&settings.logging.level, env_file.as_deref());

    let audit = audit::sink_from_settings(&settings.audit).await?;
    let store = Arc::new(PgStore::new(settings.database.url.clone()));
    let state = AppState::new(store, audit);

    let context_path = settings.server.context_path();
    let app = router(state, &context_path, &settings.active_user.protected)?;

    let address = settings.server.bind_address();
    let listener = tokio::net::TcpListener::bind(&address).await?;
    tracing::info!("participant manager listening on {}{}", address, context_path);

    axum::serve(listener, app).await?;
    Ok(())
}
