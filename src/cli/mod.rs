//! CLI commands for ear-dojo.
//!
//! - **Profile commands**: stats, reset, sync
//! - **Curriculum commands**: catalog
//! - **Training**: drill (interactive session)

// Profile commands
pub mod reset;
pub mod stats;
pub mod sync;

// Curriculum commands
pub mod catalog;

// Training
pub mod drill;

pub use catalog::CatalogCommand;
pub use drill::{DrillCommand, DrillTarget, TerminalPlayer};
pub use reset::ResetCommand;
pub use stats::StatsCommand;
pub use sync::SyncCommand;
