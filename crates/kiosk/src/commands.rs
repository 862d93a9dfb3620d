//! CLI command implementations.

use color_eyre::eyre::Result;

use kiosk_server::Server;

use crate::config::Config;

/// Start the HTTP server.
pub async fn serve(host: Option<String>, port: Option<u16>, config: Config) -> Result<()> {
    let server_config = config.to_server_config(host, port);

    if server_config.upstream.api_key.is_empty() {
        tracing::warn!(
            "OPENAI_API_KEY is not set; POST /ask will fail until a credential is configured"
        );
    }

    let server = Server::new(server_config)?;
    server.run().await?;

    Ok(())
}

/// Display version and build info.
pub fn version() {
    println!("kiosk {}", env!("CARGO_PKG_VERSION"));
    println!("A general-purpose REST utility service");
}
