//! SyncRun audit entities
//!
//! A `SyncRun` records one reconciliation run for observability: timing,
//! per-step outcome counters, and individual errors. Runs are audit trail,
//! not reconciliation state: recording them must never affect the outcome
//! of reconciliation itself (that isolation lives in the run tracker).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::newtypes::{MemberCode, RunId};

/// Terminal (or in-flight) state of a sync run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    /// Run is currently executing
    Running,
    /// Every record was reconciled without error
    Success,
    /// The run completed but some records failed or the orphan sweep was skipped
    Partial,
    /// The run aborted before completing
    Failure,
}

impl RunState {
    /// Returns true if the run is still in progress
    pub fn is_running(&self) -> bool {
        matches!(self, RunState::Running)
    }

    /// Returns true for a fully clean run
    pub fn is_success(&self) -> bool {
        matches!(self, RunState::Success)
    }
}

impl std::fmt::Display for RunState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunState::Running => write!(f, "running"),
            RunState::Success => write!(f, "success"),
            RunState::Partial => write!(f, "partial"),
            RunState::Failure => write!(f, "failure"),
        }
    }
}

/// State of an individual step within a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepState {
    /// Step has started but not finished
    Pending,
    /// Step finished without a step-level fault
    Success,
    /// Step aborted with a fault
    Failure,
}

impl std::fmt::Display for StepState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StepState::Pending => write!(f, "pending"),
            StepState::Success => write!(f, "success"),
            StepState::Failure => write!(f, "failure"),
        }
    }
}

/// Per-step outcome counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepCounts {
    pub created: u64,
    pub updated: u64,
    pub skipped: u64,
    pub deleted: u64,
    pub failed: u64,
}

/// One step of a run (e.g. "refresh", "push", "sweep")
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncStep {
    /// Storage-assigned identifier (0 until persisted)
    pub id: i64,
    /// The run this step belongs to
    pub run_id: RunId,
    /// Step name
    pub name: String,
    /// Current state
    pub state: StepState,
    /// Outcome counters
    pub counts: StepCounts,
    /// When the step started
    pub started_at: DateTime<Utc>,
    /// When the step finished (None while pending)
    pub finished_at: Option<DateTime<Utc>>,
}

/// One recorded error, attached to a run and optionally a step/member
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncErrorEntry {
    /// The run this error belongs to
    pub run_id: RunId,
    /// The step this error occurred in, if known
    pub step_id: Option<i64>,
    /// The member the error relates to, if any
    pub member_code: Option<MemberCode>,
    /// Human-readable error message
    pub message: String,
    /// When the error was recorded
    pub occurred_at: DateTime<Utc>,
}

/// A reconciliation run's audit record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncRun {
    id: RunId,
    started_at: DateTime<Utc>,
    finished_at: Option<DateTime<Utc>>,
    state: RunState,
}

impl SyncRun {
    /// Creates a new run in Running state
    pub fn new() -> Self {
        Self {
            id: RunId::new(),
            started_at: Utc::now(),
            finished_at: None,
            state: RunState::Running,
        }
    }

    /// Reconstructs a run from persisted state
    pub fn from_parts(
        id: RunId,
        started_at: DateTime<Utc>,
        finished_at: Option<DateTime<Utc>>,
        state: RunState,
    ) -> Self {
        Self {
            id,
            started_at,
            finished_at,
            state,
        }
    }

    /// Returns the run's identifier
    pub fn id(&self) -> RunId {
        self.id
    }

    /// Returns when the run started
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Returns when the run finished, if terminal
    pub fn finished_at(&self) -> Option<DateTime<Utc>> {
        self.finished_at
    }

    /// Returns the run's state
    pub fn state(&self) -> &RunState {
        &self.state
    }

    /// Transitions the run to a terminal state
    pub fn finish(&mut self, state: RunState) {
        self.state = state;
        self.finished_at = Some(Utc::now());
    }
}

impl Default for SyncRun {
    fn default() -> Self {
        Self::new()
    }
}

/// Totals emitted by one reconciliation run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcileSummary {
    /// Records in the source snapshot
    pub total: u64,
    /// Records that needed a push (changed or forced)
    pub synced: u64,
    /// Records created remotely
    pub created: u64,
    /// Records updated remotely
    pub updated: u64,
    /// Records unchanged since the last push
    pub skipped: u64,
    /// Orphans removed locally (and remotely where applicable)
    pub deleted: u64,
    /// Per-record errors accumulated during the run
    pub errors: Vec<RecordError>,
    /// True when the orphan sweep was skipped because the snapshot was empty
    pub sweep_skipped: bool,
}

impl ReconcileSummary {
    /// True when no record-level error occurred and the sweep ran
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty() && !self.sweep_skipped
    }

    /// The terminal run state this summary maps to
    pub fn run_state(&self) -> RunState {
        if self.is_clean() {
            RunState::Success
        } else {
            RunState::Partial
        }
    }
}

/// A per-record failure that did not abort the run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordError {
    /// The member the failure relates to
    pub member_code: MemberCode,
    /// What went wrong
    pub message: String,
}
