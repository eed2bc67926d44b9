//! # Cadence Core Library
//!
//! The recurrence-rule scheduling engine for recurring task definitions:
//! given a rule (how often, starting when, until when), it decides when the
//! next instance of a task template becomes due, how many instances a
//! bounded rule has produced, and when a rule's lifetime ends.
//!
//! ## Features
//!
//! - **Exact Calendar Arithmetic**: month steps preserve the day-of-month
//!   and clamp to short months; occurrence counting walks the real grid
//!   instead of dividing by an average period length
//! - **Pure Lifecycle Transitions**: `refresh` and `generate` are
//!   snapshot-in/snapshot-out with an explicit `now`, so they are trivially
//!   testable and safe to call from any execution context
//! - **Bounded Rules**: optional end date and occurrence count bounds,
//!   whichever triggers first
//! - **Explicit Collaborator Seams**: template lookup and instance
//!   persistence stay on the caller's side of the [`lifecycle::TemplateProvider`]
//!   boundary
//!
//! ## Core Modules
//!
//! - [`models`]: rules, definitions, templates, and generated instances
//! - [`recurrence`]: occurrence calculation, counting, and preview
//! - [`lifecycle`]: definition refresh, instance generation, batch sweeps
//! - [`error`]: the closed error taxonomy
//!
//! ## Example Usage
//!
//! ```rust
//! use cadence_core::error::CoreError;
//! use cadence_core::lifecycle;
//! use cadence_core::models::{
//!     Frequency, RecurrenceRule, RecurringTaskDefinition, TaskPriority, TaskTemplate,
//! };
//! use chrono::{TimeZone, Utc};
//! use std::collections::HashMap;
//! use uuid::Uuid;
//!
//! fn main() -> Result<(), CoreError> {
//!     let now = Utc.with_ymd_and_hms(2023, 1, 4, 9, 0, 0).unwrap();
//!
//!     let template = TaskTemplate {
//!         id: Uuid::now_v7(),
//!         title: "Weekly review".to_string(),
//!         description: None,
//!         priority: TaskPriority::Medium,
//!         tags: vec!["planning".to_string()],
//!     };
//!     let templates = HashMap::from([(template.id, template.clone())]);
//!
//!     let rule = RecurrenceRule::new(Frequency::Weekly, now)?;
//!     let definition = RecurringTaskDefinition::new(template.id, rule, now);
//!
//!     // an external tick refreshes, the user (or the tick) materializes
//!     let definition = lifecycle::refresh(&definition, now);
//!     let outcome = lifecycle::generate(&definition, &templates, now)?;
//!     assert_eq!(outcome.instance.due_at, now);
//!
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod lifecycle;
pub mod models;
pub mod recurrence;
