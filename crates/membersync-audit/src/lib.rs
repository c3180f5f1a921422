//! Membersync Audit - Run tracking and crash finalization
//!
//! Provides:
//! - `RunTracker`: non-fatal recording of runs, steps, and errors
//! - `supervise`: top-level error boundary that finalizes the active run
//!   as a failure when the reconciliation task crashes

pub mod supervisor;
pub mod tracker;

pub use supervisor::supervise;
pub use tracker::RunTracker;
