//! Scripted build orchestration.
//!
//! Translates a spark's build configuration into a fixed-skeleton step
//! sequence and plays it back against the board store, one synthetic step
//! at a time:
//!
//! ```text
//!   server::api ──► BuildRunner::start ──► mark_building
//!                        │ (spawned)
//!                        ▼
//!                  plan::build_plan ──► record_step × N ──► finish_build
//!                        │                   │
//!                        ▼                   ▼
//!                  actor per step      ws broadcast
//! ```
//!
//! | Module      | Responsibility                                         |
//! |-------------|--------------------------------------------------------|
//! | `plan`      | Step skeleton, detail humanizing, transcript messages  |
//! | `runner`    | Pacing, actor assignment, run lifecycle, one run/spark |

pub mod plan;
pub mod runner;

pub use plan::{PlannedStep, build_plan, closing_message, opening_message};
pub use runner::{BuildRunner, Pacing};
