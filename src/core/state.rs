//! Execution state models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Overall run status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExecutionStatus {
    /// Run has not started
    Pending,
    /// Run is in progress
    Running,
    /// Every step completed
    Completed,
    /// A step failed and the rest were skipped
    Failed,
}

/// The four steps of a run, in the only order they may execute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepKind {
    /// Download the JSON payload
    Fetch,
    /// Throttle, convert and write the XML document
    Transform,
    /// Write the verbatim JSON payload
    Persist,
    /// Bundle both files into the archive
    Archive,
}

impl StepKind {
    /// All steps in execution order
    pub const ALL: [StepKind; 4] = [
        StepKind::Fetch,
        StepKind::Transform,
        StepKind::Persist,
        StepKind::Archive,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StepKind::Fetch => "fetch",
            StepKind::Transform => "transform",
            StepKind::Persist => "persist",
            StepKind::Archive => "archive",
        }
    }
}

impl fmt::Display for StepKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// State of a single step
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum StepState {
    /// Step has not been reached yet
    Pending,
    /// Step is currently running
    Running {
        started_at: DateTime<Utc>,
    },
    /// Step completed successfully
    Completed {
        started_at: DateTime<Utc>,
        completed_at: DateTime<Utc>,
    },
    /// Step failed
    Failed {
        error: String,
        started_at: DateTime<Utc>,
        failed_at: DateTime<Utc>,
    },
    /// Step never ran because an earlier one failed
    Skipped {
        reason: String,
    },
}

impl StepState {
    fn started_at(&self) -> DateTime<Utc> {
        match self {
            StepState::Running { started_at } => *started_at,
            _ => Utc::now(),
        }
    }
}

/// State of one relay run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunState {
    /// Unique run ID
    pub execution_id: Uuid,

    /// Current run status
    pub status: ExecutionStatus,

    /// When the run started
    pub started_at: Option<DateTime<Utc>>,

    /// When the run completed/failed
    pub completed_at: Option<DateTime<Utc>>,

    /// Per-step state, indexed in `StepKind::ALL` order
    steps: [StepState; 4],
}

impl RunState {
    /// Create a new run state
    pub fn new() -> Self {
        Self {
            execution_id: Uuid::new_v4(),
            status: ExecutionStatus::Pending,
            started_at: None,
            completed_at: None,
            steps: [
                StepState::Pending,
                StepState::Pending,
                StepState::Pending,
                StepState::Pending,
            ],
        }
    }

    fn index(kind: StepKind) -> usize {
        match kind {
            StepKind::Fetch => 0,
            StepKind::Transform => 1,
            StepKind::Persist => 2,
            StepKind::Archive => 3,
        }
    }

    /// Get the state of a step
    pub fn step(&self, kind: StepKind) -> &StepState {
        &self.steps[Self::index(kind)]
    }

    /// Mark run as started
    pub fn start(&mut self) {
        self.status = ExecutionStatus::Running;
        self.started_at = Some(Utc::now());
    }

    /// Mark run as completed
    pub fn complete(&mut self) {
        self.status = ExecutionStatus::Completed;
        self.completed_at = Some(Utc::now());
    }

    /// Mark run as failed
    pub fn fail(&mut self) {
        self.status = ExecutionStatus::Failed;
        self.completed_at = Some(Utc::now());
    }

    pub fn start_step(&mut self, kind: StepKind) {
        self.steps[Self::index(kind)] = StepState::Running {
            started_at: Utc::now(),
        };
    }

    pub fn complete_step(&mut self, kind: StepKind) {
        let slot = &mut self.steps[Self::index(kind)];
        *slot = StepState::Completed {
            started_at: slot.started_at(),
            completed_at: Utc::now(),
        };
    }

    /// Mark a step failed and return the steps that were skipped as a result
    pub fn fail_step(&mut self, kind: StepKind, error: String) -> Vec<StepKind> {
        let slot = &mut self.steps[Self::index(kind)];
        *slot = StepState::Failed {
            error,
            started_at: slot.started_at(),
            failed_at: Utc::now(),
        };

        let mut skipped = Vec::new();
        for later in StepKind::ALL.iter().skip(Self::index(kind) + 1) {
            let slot = &mut self.steps[Self::index(*later)];
            if matches!(slot, StepState::Pending) {
                *slot = StepState::Skipped {
                    reason: format!("{} failed", kind),
                };
                skipped.push(*later);
            }
        }
        skipped
    }

    /// Number of completed steps
    pub fn completed_steps(&self) -> usize {
        self.steps
            .iter()
            .filter(|s| matches!(s, StepState::Completed { .. }))
            .count()
    }

    /// The step that failed, if any
    pub fn failed_step(&self) -> Option<StepKind> {
        StepKind::ALL
            .into_iter()
            .find(|kind| matches!(self.step(*kind), StepState::Failed { .. }))
    }
}

impl Default for RunState {
    fn default() -> Self {
        Self::new()
    }
}
