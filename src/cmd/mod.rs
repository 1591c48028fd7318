//! CLI command implementations.
//!
//! | Module  | Commands handled                     |
//! |---------|--------------------------------------|
//! | `serve` | `Serve`                              |
//! | `board` | `Board`, `Agents`, `Registry`        |
//! | `reset` | `Reset`                              |

pub mod board;
pub mod reset;
pub mod serve;

pub use board::{cmd_agents, cmd_board, cmd_registry};
pub use reset::cmd_reset;
pub use serve::cmd_serve;
