//! Board server command — `cassa serve`.

use anyhow::Result;

use cassa::config::CassaConfig;

pub async fn cmd_serve(config: CassaConfig, open: bool) -> Result<()> {
    // Spawn browser open before starting the server (which blocks).
    // Skip in dev mode (no browser inside containers).
    if open && !config.dev_mode {
        let url = format!("http://localhost:{}", config.port);
        tokio::spawn(async move {
            // Small delay to let the server start binding
            tokio::time::sleep(tokio::time::Duration::from_millis(500)).await;
            if let Err(e) = open::that(&url) {
                eprintln!("Failed to open browser: {}", e);
            }
        });
    }

    cassa::server::start_server(config).await
}
