//! Read-only inspection commands — `cassa board`, `cassa agents`,
//! `cassa registry`.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use console::style;

use cassa::board::db::{DbHandle, SnapshotDb};
use cassa::board::models::{Snapshot, TrackId};
use cassa::board::store::BoardStore;
use cassa::registry::{CatalogEntry, Registry};

/// Print the current board, one track at a time.
pub async fn cmd_board(db_path: &Path) -> Result<()> {
    let registry = Registry::load()?;
    let snapshot = if db_path.exists() {
        let db = DbHandle::new(SnapshotDb::new(db_path).context("Failed to open board database")?);
        BoardStore::open(Arc::new(db), &registry).await.snapshot().await
    } else {
        println!(
            "{} no board database at {}, showing the seed layout",
            style("note:").yellow(),
            db_path.display()
        );
        registry.seed_snapshot()
    };

    print_track(&snapshot, &TrackId::Alpha);
    print_track(&snapshot, &TrackId::Bravo);
    println!(
        "{} spark(s) on the board",
        style(snapshot.spark_count()).bold()
    );
    Ok(())
}

fn print_track(snapshot: &Snapshot, track: &TrackId) {
    println!(
        "\n{} ({})",
        style(track.display_name()).bold().underlined(),
        track
    );
    for stage in snapshot.track(track) {
        println!("  {}", style(&stage.title).bold());
        if stage.sparks.is_empty() {
            println!("    {}", style("(empty)").dim());
        }
        for spark in &stage.sparks {
            let origin = spark
                .origin
                .as_ref()
                .map(|o| format!("  (from {}/{})", o.domain_id, o.stage_id))
                .unwrap_or_default();
            println!(
                "    - {} [{}]{}",
                spark.title,
                style(&spark.status).cyan(),
                style(origin).dim()
            );
        }
    }
}

/// Print the agent roster.
pub fn cmd_agents() -> Result<()> {
    let registry = Registry::load()?;
    println!("{}", style("Agent roster").bold().underlined());
    for agent in registry.agents() {
        println!(
            "  {:<10} {:<28} [{}]",
            style(&agent.name).bold(),
            agent.role,
            style(agent.domain.label()).cyan()
        );
        println!("    {}", style(agent.skills.join(", ")).dim());
    }
    Ok(())
}

/// Print the build option catalog.
pub fn cmd_registry() -> Result<()> {
    let registry = Registry::load()?;
    let catalog = registry.catalog();
    print_slot("Templates", &catalog.templates);
    print_slot("UI add-ons", &catalog.ui);
    print_slot("Services", &catalog.services);
    print_slot("Datastores", &catalog.datastores);
    Ok(())
}

fn print_slot(label: &str, entries: &[CatalogEntry]) {
    println!("{}", style(label).bold().underlined());
    for entry in entries {
        println!(
            "  {:<14} {:<22} [{}]",
            style(&entry.id).bold(),
            entry.name,
            style(entry.domain_affinity.label()).cyan()
        );
    }
    println!();
}
