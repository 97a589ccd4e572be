pub mod analysis;
pub mod config;
pub mod engine;
pub mod error;
pub mod hasher;
pub mod progress;
pub mod scanner;

pub use config::{AppConfig, DirectoryRoot, MatchOptions};
pub use engine::{reconcile_scanned, ReconcileEngine, Reconciliation, StageTimings};
pub use error::Error;
pub use progress::{ProgressReporter, SilentReporter};
