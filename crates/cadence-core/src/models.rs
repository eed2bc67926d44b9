use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

/// How often a recurrence rule fires.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Frequency {
    Daily,
    Weekly,
    BiWeekly,
    Monthly,
    /// Every `interval` units of `unit`. The interval must be at least 1,
    /// enforced by [`RecurrenceRule::new`](crate::models::RecurrenceRule::new).
    Custom { interval: u32, unit: IntervalUnit },
}

impl std::fmt::Display for Frequency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Frequency::Daily => write!(f, "daily"),
            Frequency::Weekly => write!(f, "weekly"),
            Frequency::BiWeekly => write!(f, "biweekly"),
            Frequency::Monthly => write!(f, "monthly"),
            Frequency::Custom { interval, unit } => write!(f, "every {} {}", interval, unit),
        }
    }
}

impl FromStr for Frequency {
    type Err = ParseFrequencyError;

    /// Parses the fixed frequencies. Custom frequencies carry an interval and
    /// unit and are built directly by the caller.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "daily" => Ok(Frequency::Daily),
            "weekly" => Ok(Frequency::Weekly),
            "biweekly" | "bi-weekly" => Ok(Frequency::BiWeekly),
            "monthly" => Ok(Frequency::Monthly),
            _ => Err(ParseFrequencyError(s.to_string())),
        }
    }
}

#[derive(Error, Debug, PartialEq)]
#[error("Invalid frequency: {0}")]
pub struct ParseFrequencyError(String);

/// Step unit for custom frequencies.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum IntervalUnit {
    Days,
    Weeks,
    Months,
}

impl std::fmt::Display for IntervalUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IntervalUnit::Days => write!(f, "days"),
            IntervalUnit::Weeks => write!(f, "weeks"),
            IntervalUnit::Months => write!(f, "months"),
        }
    }
}

impl FromStr for IntervalUnit {
    type Err = ParseIntervalUnitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "day" | "days" => Ok(IntervalUnit::Days),
            "week" | "weeks" => Ok(IntervalUnit::Weeks),
            "month" | "months" => Ok(IntervalUnit::Months),
            _ => Err(ParseIntervalUnitError(s.to_string())),
        }
    }
}

#[derive(Error, Debug, PartialEq)]
#[error("Invalid interval unit: {0}")]
pub struct ParseIntervalUnitError(String);

/// The frequency/interval/termination policy governing when occurrences of a
/// recurring task happen. Immutable once created; build one through
/// [`RecurrenceRule::new`](crate::models::RecurrenceRule::new) so the
/// interval is validated up front.
///
/// A rule may be unbounded, bounded by date, bounded by count, or bounded by
/// both. Whichever bound triggers first wins.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RecurrenceRule {
    pub frequency: Frequency,
    /// The first possible occurrence date. The first occurrence *is* this
    /// date, not this date plus one interval.
    pub anchor_start: DateTime<Utc>,
    /// No occurrence later than this date is ever generated.
    pub end_bound: Option<DateTime<Utc>>,
    /// Maximum number of occurrences ever to be generated.
    pub count_bound: Option<u32>,
}

/// A recurring task definition: binds a recurrence rule to an external task
/// template and tracks how far the rule has been consumed.
///
/// `created_at`/`updated_at` are bookkeeping for the owning store; the
/// engine's refresh and generation paths never touch them.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RecurringTaskDefinition {
    /// Primary key, UUIDv7 for time-ordered performance
    #[serde(with = "uuid::serde::compact")]
    pub id: Uuid,
    /// Reference to the task template owned by the collaborator task store
    #[serde(with = "uuid::serde::compact")]
    pub template_id: Uuid,
    pub rule: RecurrenceRule,
    /// `false` is terminal: the definition produces no further occurrences
    /// unless explicitly reactivated by a user action.
    pub active: bool,
    /// Most recently materialized occurrence, if any
    pub last_generated_at: Option<DateTime<Utc>>,
    /// Next occurrence not yet materialized; `None` means "needs recompute"
    pub next_due_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RecurringTaskDefinition {
    /// Creates a fresh definition: active, nothing generated, due date not
    /// yet computed.
    pub fn new(template_id: Uuid, rule: RecurrenceRule, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::now_v7(),
            template_id,
            rule,
            active: true,
            last_generated_at: None,
            next_due_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether an occurrence is due for materialization at `now`.
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.active && self.next_due_at.is_some_and(|due| due <= now)
    }

    /// User-action hook: stops the definition from producing occurrences.
    pub fn deactivated(&self, now: DateTime<Utc>) -> Self {
        let mut updated = self.clone();
        updated.active = false;
        updated.next_due_at = None;
        updated.updated_at = now;
        updated
    }

    /// User-action hook: resumes a stopped definition. The due date is left
    /// unset so the next refresh recomputes it.
    pub fn reactivated(&self, now: DateTime<Utc>) -> Self {
        let mut updated = self.clone();
        updated.active = true;
        updated.next_due_at = None;
        updated.updated_at = now;
        updated
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    NotStarted,
    InProgress,
    Completed,
}

#[derive(Error, Debug, PartialEq)]
#[error("Invalid task status: {0}")]
pub struct ParseTaskStatusError(String);

impl FromStr for TaskStatus {
    type Err = ParseTaskStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "not_started" | "notstarted" => Ok(TaskStatus::NotStarted),
            "in_progress" | "inprogress" => Ok(TaskStatus::InProgress),
            "completed" => Ok(TaskStatus::Completed),
            _ => Err(ParseTaskStatusError(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TaskPriority {
    None,
    Low,
    Medium,
    High,
}

#[derive(Error, Debug, PartialEq)]
#[error("Invalid task priority: {0}")]
pub struct ParseTaskPriorityError(String);

impl FromStr for TaskPriority {
    type Err = ParseTaskPriorityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "none" => Ok(TaskPriority::None),
            "low" => Ok(TaskPriority::Low),
            "medium" => Ok(TaskPriority::Medium),
            "high" => Ok(TaskPriority::High),
            _ => Err(ParseTaskPriorityError(s.to_string())),
        }
    }
}

/// Snapshot of a task template as resolved by the collaborator task store.
/// The engine copies from it at generation time and never mutates it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TaskTemplate {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub priority: TaskPriority,
    pub tags: Vec<String>,
}

/// A concrete task materialized from a definition's template. The engine
/// returns instances to the caller; persisting them into the task store is
/// the caller's responsibility.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GeneratedTaskInstance {
    pub id: Uuid,
    pub definition_id: Uuid,
    pub template_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub priority: TaskPriority,
    pub tags: Vec<String>,
    /// The definition's due date at the moment of generation
    pub due_at: DateTime<Utc>,
    pub status: TaskStatus,
}
