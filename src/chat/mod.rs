//! Persona chat relay.
//!
//! Bridges spark transcripts to the external streaming completion service:
//!
//! ```text
//!   server::api ──► Relay::send ──► CompletionClient::stream_reply
//!                      │                    │
//!                      │ filter/append      │ SSE fragments
//!                      ▼                    ▼
//!               conversational turns    on_chunk(text)
//! ```
//!
//! | Module    | Responsibility                                          |
//! |-----------|---------------------------------------------------------|
//! | `relay`   | Local validation, turn filtering, error translation     |
//! | `gemini`  | HTTP transport and SSE frame parsing for the live model |

pub mod gemini;
pub mod relay;

pub use gemini::{DEFAULT_MODEL, GeminiClient};
pub use relay::{ChatTurn, CompletionClient, Relay};
