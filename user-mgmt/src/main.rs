use std::sync::Arc;

use mail::SmtpMailer;
use user_mgmt::settings::{ENV_PREFIX, Settings};
use user_mgmt::{AppState, router};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let env_file = common::load_dotenv();
    let settings: Settings = common::load_settings("user-mgmt", ENV_PREFIX)?;
    common::init_tracing(&settings.logging.level, env_file.as_deref());

    let state = AppState {
        mailer: Arc::new(SmtpMailer::new(settings.mail.clone())),
        audit: audit::sink_from_settings(&settings.audit).await?,
        feedback: Arc::new(settings.feedback.clone()),
        contact_us: Arc::new(settings.contact_us.clone()),
    };

    let context_path = settings.server.context_path();
    let app = router(state, settings.auth.introspector(), &context_path);

    let address = settings.server.bind_address();
    let listener = tokio::net::TcpListener::bind(&address).await?;
    tracing::info!("user-mgmt listening on {}{}", address, context_path);

    axum::serve(listener, app).await?;
    Ok(())
}
