// src/lib.rs
pub mod cli;
pub mod config;
pub mod engine;
pub mod enrich;
pub mod error;
pub mod output;
pub mod resolver;
pub mod session;
pub mod sources;
pub mod types;
pub mod utils;

pub use cli::Args;
pub use engine::Engine;
pub use types::{Config, RunStats, SourceKind, SubdomainRecord, SubhoundError};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
pub const LONG_VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("GIT_HASH"),
    ", built ",
    env!("BUILD_TIME"),
    ")"
);
