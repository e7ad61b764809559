use std::time::Duration;

use mongodb::{Client, Database, bson::doc, options::ClientOptions};
use tokio::time::sleep;
use tracing::warn;

use super::error::{MongoDaoError, MongoResult};

// The storage supervisor re-runs the whole connect with its own backoff, so
// only a short burst of pings happens here before giving up.
const PING_ATTEMPTS: u32 = 3;
const PING_GAP: Duration = Duration::from_millis(500);

/// Build a client for the match database and verify it answers a ping.
pub async fn establish_connection(
    options: &ClientOptions,
    database_name: &str,
) -> MongoResult<(Client, Database)> {
    let client = Client::with_options(options.clone())
        .map_err(|source| MongoDaoError::ClientConstruction { source })?;
    let database = client.database(database_name);

    let mut attempt = 0;
    loop {
        attempt += 1;
        match database.run_command(doc! { "ping": 1 }).await {
            Ok(_) => return Ok((client, database)),
            Err(source) if attempt >= PING_ATTEMPTS => {
                return Err(MongoDaoError::InitialPing {
                    attempts: attempt,
                    source,
                });
            }
            Err(_) => {
                warn!(attempt, database_name, "match database did not answer the ping");
                sleep(PING_GAP).await;
            }
        }
    }
}
