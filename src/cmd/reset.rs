//! Board reset command — `cassa reset`.

use std::path::Path;

use anyhow::{Context, Result};
use console::style;
use dialoguer::Confirm;

use cassa::board::db::{SnapshotDb, SnapshotStore};

/// Clear the persisted snapshot; the next load reseeds from templates.
pub async fn cmd_reset(db_path: &Path, yes: bool) -> Result<()> {
    if !db_path.exists() {
        println!("No board database at {}; nothing to reset.", db_path.display());
        return Ok(());
    }

    if !yes {
        let confirmed = Confirm::new()
            .with_prompt(format!(
                "Clear the stored board at {}? Every spark will be lost",
                db_path.display()
            ))
            .default(false)
            .interact()
            .context("Failed to read confirmation")?;
        if !confirmed {
            println!("Aborted.");
            return Ok(());
        }
    }

    let db = cassa::board::db::DbHandle::new(
        SnapshotDb::new(db_path).context("Failed to open board database")?,
    );
    db.clear().await?;
    println!("{} Board cleared; it will reseed on next load.", style("✓").green());
    Ok(())
}
