pub mod client;
pub mod config;
pub mod dedup;
pub mod derive;
pub mod engine;
pub mod error;
pub mod links;
pub mod models;
pub mod rules;
pub mod server;

pub use client::{HttpLedgerClient, LedgerApi};
pub use config::RelayConfig;
pub use engine::{Outcome, RelayEngine};
pub use error::{RelayError, Result};
