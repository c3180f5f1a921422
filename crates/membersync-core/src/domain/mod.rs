//! Domain module - pure business logic
//!
//! Entities, newtypes, canonical hashing, and error types. Nothing in this
//! module performs I/O.

pub mod canonical;
pub mod errors;
pub mod member;
pub mod newtypes;
pub mod run;

pub use errors::{DomainError, RemoteError};
pub use member::{MemberRecord, SourceRecord};
pub use newtypes::{ContentHash, MemberCode, RemoteId, RunId};
pub use run::{
    ReconcileSummary, RecordError, RunState, StepCounts, StepState, SyncErrorEntry, SyncRun,
    SyncStep,
};
