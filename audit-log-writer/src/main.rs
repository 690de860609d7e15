mod consumer;
mod db;
mod settings;

use std::time::Duration;

use consumer::{Disposition, delete_message, handle_message, receive_messages};
use db::PgEventStore;
use settings::{ENV_PREFIX, Settings};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let env_file = common::load_dotenv();
    let settings: Settings = common::load_settings("audit-log-writer", ENV_PREFIX)?;
    common::init_tracing(&settings.logging.level, env_file.as_deref());

    let client = aws_sdk_sqs::Client::new(&aws_config::load_from_env().await);
    let store = PgEventStore::new(settings.database.url.clone());
    let queue = &settings.queue;
    tracing::info!("Draining audit events from {}", queue.url);

    loop {
        let messages = receive_messages(&client, &queue.url, queue.batch_size)
            .await
            .unwrap_or_else(|err| {
                tracing::error!("Error receiving audit events: {}", err);
                Vec::new()
            });

        for message in messages {
            if handle_message(message.body.as_deref(), &store) == Disposition::Retain {
                continue;
            }
            let Some(receipt_handle) = message.receipt_handle.as_deref() else {
                tracing::warn!("Message {:?} has no receipt handle", message.message_id);
                continue;
            };
            delete_message(&client, &queue.url, receipt_handle)
                .await
                .unwrap_or_else(|err| {
                    tracing::error!("Error deleting message: {}", err);
                });
        }

        // wait before checking the queue again
        tokio::time::sleep(Duration::from_secs(queue.poll_interval_secs)).await;
    }
}
