//! Cassa Vegas board — two-track workflow state and its persistence.
//!
//! ## Overview
//!
//! The board subsystem owns the authoritative in-memory snapshot: two fixed
//! tracks (`alpha` "Alpha Crew", `bravo` "Bravo Ops"), each an ordered list
//! of stages, each stage holding work items ("sparks"). Every mutation goes
//! through `BoardStore`, which rebuilds the affected stage list wholesale
//! and mirrors the committed snapshot to SQLite write-behind.
//!
//! ## Module Map
//!
//! ```text
//! ┌──────────┐  HTTP/WS  ┌──────────────────────────────────────────────┐
//! │  Client  │ ────────> │  server::api  (route handlers, AppState)    │
//! └──────────┘           │        │                                     │
//!                        │        v                                     │
//!                        │  store.rs  (BoardStore: seed / save /        │
//!                        │             handoff / transcript appends)    │
//!                        │        │ write-behind persist()              │
//!                        │        v                                     │
//!                        │  db.rs  (SnapshotStore trait, DbHandle over  │
//!                        │          rusqlite, MemoryStore test double)  │
//!                        └──────────────────────────────────────────────┘
//! ```
//!
//! ## Supporting Modules
//!
//! | Module   | Responsibility                                            |
//! |----------|-----------------------------------------------------------|
//! | `models` | Shared types: `Spark`, `Stage`, `Snapshot`, `Message`     |
//! | `db`     | Single-key snapshot persistence behind `SnapshotStore`    |
//! | `store`  | `BoardStore` — seeding, save, handoff, transcript ops     |
//!
//! ## Handoff Flow (spark moves between tracks)
//!
//! 1. `POST /api/sparks/:id/handoff` resolves the acting agent in the
//!    roster, then calls `BoardStore::handoff()`.
//! 2. The store locates the spark in its recorded current track; a miss
//!    aborts with `SparkNotFound` and the snapshot stays untouched.
//! 3. On a clone of the snapshot: the spark leaves its old stage, gains a
//!    system transcript entry naming agent, stage, target track, and note,
//!    has its origin stamped if this is its first handoff, and lands at the
//!    end of the target stage. The clone then replaces the live snapshot in
//!    one assignment.
//! 4. The updated snapshot persists write-behind; the committed spark is
//!    broadcast to WebSocket subscribers.

pub mod db;
pub mod models;
pub mod store;
