//! SoyBoy level pipeline
//!
//! Saves hand-placed level arrangements to descriptor files, rebuilds them
//! into a running world, and keeps per-player completion times:
//! - Capture: level container children -> RON descriptor
//! - Load: descriptor -> fresh container, player and camera placement
//! - Repository: deterministic level discovery and selection
//! - Scores: versioned JSON ledger per (player, level)

/// Version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod capture;
pub mod descriptor;
pub mod loader;
pub mod repository;
pub mod scene;
pub mod scores;
pub mod session;
pub mod settings;
pub mod storage;

pub use capture::{CaptureError, LevelCapture};
pub use loader::{LevelLoader, LoadError, LoadIssue, LoadReport};
pub use repository::{LevelInfo, LevelRepository, SelectionHandle};
pub use session::{LevelSession, SessionError};
pub use settings::Settings;
