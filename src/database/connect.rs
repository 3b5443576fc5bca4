use crate::config::DatabaseConfig;
use crate::error::Result;
use tokio_postgres::{Client, NoTls};
use tracing::{error, info};
use validator::Validate;

/// Open a client and hand the connection driver to the runtime.
///
/// The connection closes once the returned client is dropped.
pub async fn connect(config: &DatabaseConfig) -> Result<Client> {
    if let Err(e) = config.validate() {
        error!("Invalid database settings: {}", e);
        return Err(e.into());
    }
    info!(
        "Connecting to database {} at {}:{} as {}",
        config.name, config.host, config.port, config.user
    );

    let (client, connection) = match config.to_pg_config().connect(NoTls).await {
        Ok(pair) => pair,
        Err(e) => {
            error!(
                "Failed to connect to database {} at {}:{}: {}",
                config.name, config.host, config.port, e
            );
            return Err(e.into());
        }
    };
    tokio::spawn(async move {
        if let Err(e) = connection.await {
            error!("Database connection error: {}", e);
        }
    });

    Ok(client)
}
