use chrono::{DateTime, Utc};
use std::collections::HashMap;
use uuid::Uuid;

use crate::error::CoreError;
use crate::models::{GeneratedTaskInstance, RecurringTaskDefinition, TaskStatus, TaskTemplate};

/// Template Provider boundary: resolves a template id to the current
/// snapshot of the template, or `None` if the store no longer has it. The
/// engine never looks templates up on its own; callers supply a provider
/// into [`generate`].
pub trait TemplateProvider {
    fn resolve(&self, template_id: Uuid) -> Option<TaskTemplate>;
}

impl TemplateProvider for HashMap<Uuid, TaskTemplate> {
    fn resolve(&self, template_id: Uuid) -> Option<TaskTemplate> {
        self.get(&template_id).cloned()
    }
}

/// Recomputes a definition's lifecycle state at `now`.
///
/// # Behavior
/// - Inactive definitions are returned unchanged; inactivity is terminal.
/// - A definition whose due date is set and still in the future is returned
///   unchanged; nothing is due yet.
/// - Otherwise the next occurrence candidate is computed from the last
///   generated occurrence (or the rule's anchor for a fresh definition) and
///   checked against the rule's bounds, date bound first. A candidate past
///   the date bound, or a rule whose occurrence count is already exhausted,
///   deactivates the definition and leaves the due date unset. A surviving
///   candidate becomes the due date.
///
/// Idempotent for a fixed `now`; callers may invoke it opportunistically
/// and redundantly. `now` must not move backwards across calls, which is
/// the caller's obligation. Bookkeeping timestamps are left to the owning
/// store.
pub fn refresh(definition: &RecurringTaskDefinition, now: DateTime<Utc>) -> RecurringTaskDefinition {
    if !definition.active {
        return definition.clone();
    }
    if let Some(due) = definition.next_due_at {
        if now < due {
            return definition.clone();
        }
    }

    let rule = &definition.rule;
    let candidate = rule.next_occurrence(definition.last_generated_at);
    let mut updated = definition.clone();

    if rule.end_bound.is_some_and(|end| candidate > end) {
        updated.active = false;
        updated.next_due_at = None;
        return updated;
    }
    if rule
        .count_bound
        .is_some_and(|limit| rule.occurrences_through(definition.last_generated_at) >= limit)
    {
        updated.active = false;
        updated.next_due_at = None;
        return updated;
    }

    updated.next_due_at = Some(candidate);
    updated
}

/// A materialized instance together with the advanced definition snapshot.
/// Persisting both is the caller's responsibility.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationOutcome {
    pub instance: GeneratedTaskInstance,
    pub definition: RecurringTaskDefinition,
}

/// Materializes the due occurrence of a definition into a concrete task
/// instance and advances the definition's lifecycle state.
///
/// # Errors
/// * `CoreError::DefinitionInactive` if the definition no longer produces
///   occurrences.
/// * `CoreError::NotYetDue` if no due date is set or it is still in the
///   future; callers are expected to [`refresh`] first.
/// * `CoreError::TemplateUnavailable` if the provider cannot resolve the
///   definition's template.
///
/// On success the instance copies the template's content and is due at the
/// definition's due date; the returned definition has `last_generated_at =
/// now` and its due date unset, so the next refresh computes the following
/// occurrence from this new anchor. No side effects beyond the returned
/// values.
pub fn generate(
    definition: &RecurringTaskDefinition,
    templates: &dyn TemplateProvider,
    now: DateTime<Utc>,
) -> Result<GenerationOutcome, CoreError> {
    if !definition.active {
        return Err(CoreError::DefinitionInactive(definition.id));
    }
    let due_at = match definition.next_due_at {
        Some(due_at) if due_at <= now => due_at,
        _ => return Err(CoreError::NotYetDue(definition.id)),
    };
    let template = templates
        .resolve(definition.template_id)
        .ok_or(CoreError::TemplateUnavailable(definition.template_id))?;

    let instance = GeneratedTaskInstance {
        id: Uuid::now_v7(),
        definition_id: definition.id,
        template_id: template.id,
        title: template.title,
        description: template.description,
        priority: template.priority,
        tags: template.tags,
        due_at,
        status: TaskStatus::NotStarted,
    };

    let mut updated = definition.clone();
    updated.last_generated_at = Some(now);
    updated.next_due_at = None;

    Ok(GenerationOutcome {
        instance,
        definition: updated,
    })
}

/// Configuration for sweep behavior
#[derive(Debug, Clone)]
pub struct SweepConfig {
    /// Limit for instances created in one sweep
    pub max_batch_size: usize,
    /// Whether due occurrences are materialized during the sweep. Off by
    /// default: materialization stays an explicit caller action.
    pub materialize_due: bool,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            max_batch_size: 100,
            materialize_due: false,
        }
    }
}

/// Statistics collected during a sweep
#[derive(Debug, Clone, Default)]
pub struct SweepSummary {
    /// Number of definitions processed
    pub definitions_processed: usize,
    /// Definitions with an occurrence due at sweep time
    pub due: usize,
    /// Definitions that reached a terminal bound during the sweep
    pub deactivated: usize,
    /// Instances created (only when materialization is enabled)
    pub instances_created: usize,
    /// Detailed error messages from failed generations
    pub errors: Vec<String>,
}

/// The result of sweeping a batch of definitions: every definition in its
/// refreshed state, any instances materialized along the way, and summary
/// statistics.
#[derive(Debug, Clone)]
pub struct SweepOutcome {
    pub definitions: Vec<RecurringTaskDefinition>,
    pub instances: Vec<GeneratedTaskInstance>,
    pub summary: SweepSummary,
}

/// SweepManager: drives [`refresh`] across a batch of definitions on behalf
/// of the integrator's periodic tick.
///
/// The engine carries no timer of its own; the integrator calls
/// [`sweep`](SweepManager::sweep) with an explicit `now` from whatever
/// scheduling construct it runs. With `materialize_due` enabled the sweep
/// also generates due instances, at most `max_batch_size` per call, and
/// records per-definition failures without aborting the batch.
pub struct SweepManager {
    config: SweepConfig,
}

impl SweepManager {
    pub fn new(config: SweepConfig) -> Self {
        Self { config }
    }

    pub fn with_defaults() -> Self {
        Self::new(SweepConfig::default())
    }

    pub fn config(&self) -> &SweepConfig {
        &self.config
    }

    pub fn update_config(&mut self, config: SweepConfig) {
        self.config = config;
    }

    /// Refreshes every definition and, when configured, materializes due
    /// occurrences. Definitions that generate are refreshed again so they
    /// leave the sweep with their following occurrence (or terminal state)
    /// in place.
    pub fn sweep(
        &self,
        definitions: &[RecurringTaskDefinition],
        templates: &dyn TemplateProvider,
        now: DateTime<Utc>,
    ) -> SweepOutcome {
        let mut summary = SweepSummary::default();
        let mut swept = Vec::with_capacity(definitions.len());
        let mut instances = Vec::new();

        for definition in definitions {
            summary.definitions_processed += 1;

            let mut current = refresh(definition, now);
            if definition.active && !current.active {
                summary.deactivated += 1;
            }

            if current.is_due(now) {
                summary.due += 1;
                if self.config.materialize_due && instances.len() < self.config.max_batch_size {
                    match generate(&current, templates, now) {
                        Ok(outcome) => {
                            instances.push(outcome.instance);
                            summary.instances_created += 1;
                            current = refresh(&outcome.definition, now);
                            if !current.active {
                                summary.deactivated += 1;
                            }
                        }
                        Err(err) => summary.errors.push(err.to_string()),
                    }
                }
            }

            swept.push(current);
        }

        SweepOutcome {
            definitions: swept,
            instances,
            summary,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Frequency, RecurrenceRule, TaskPriority};
    use chrono::{Duration, TimeZone};

    fn at(year: i32, month: u32, day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(year, month, day, 8, 0, 0).unwrap()
    }

    fn weekly_definition(anchor: DateTime<Utc>) -> RecurringTaskDefinition {
        let rule = RecurrenceRule::new(Frequency::Weekly, anchor).unwrap();
        RecurringTaskDefinition::new(Uuid::now_v7(), rule, anchor)
    }

    fn template_for(definition: &RecurringTaskDefinition) -> HashMap<Uuid, TaskTemplate> {
        let template = TaskTemplate {
            id: definition.template_id,
            title: "Water the plants".to_string(),
            description: Some("Kitchen and balcony".to_string()),
            priority: TaskPriority::Low,
            tags: vec!["home".to_string(), "weekly".to_string()],
        };
        HashMap::from([(template.id, template)])
    }

    mod refresh_tests {
        use super::*;

        #[test]
        fn fresh_definition_becomes_due_at_the_anchor() {
            let definition = weekly_definition(at(2023, 1, 4));
            let refreshed = refresh(&definition, at(2023, 1, 4));
            assert!(refreshed.active);
            assert_eq!(refreshed.next_due_at, Some(at(2023, 1, 4)));
        }

        #[test]
        fn future_due_date_is_left_untouched() {
            let definition = weekly_definition(at(2023, 1, 4));
            let refreshed = refresh(&definition, at(2023, 1, 4));
            let again = refresh(&refreshed, at(2023, 1, 5));
            assert_eq!(again, refreshed);
        }

        #[test]
        fn inactive_definitions_are_not_resurrected() {
            let definition = weekly_definition(at(2023, 1, 4)).deactivated(at(2023, 1, 4));
            let refreshed = refresh(&definition, at(2023, 2, 1));
            assert_eq!(refreshed, definition);
        }

        #[test]
        fn refresh_is_idempotent_at_a_fixed_instant() {
            let definition = weekly_definition(at(2023, 1, 4));
            let now = at(2023, 1, 20);
            assert_eq!(refresh(&refresh(&definition, now), now), refresh(&definition, now));
        }

        #[test]
        fn end_bound_before_anchor_terminates_immediately() {
            let anchor = at(2023, 6, 1);
            let rule = RecurrenceRule::new(Frequency::Daily, anchor)
                .unwrap()
                .until(anchor - Duration::days(30));
            let definition = RecurringTaskDefinition::new(Uuid::now_v7(), rule, anchor);
            let refreshed = refresh(&definition, anchor);
            assert!(!refreshed.active);
            assert_eq!(refreshed.next_due_at, None);
        }

        #[test]
        fn occurrence_exactly_on_the_end_bound_is_still_due() {
            let anchor = at(2023, 1, 4);
            let rule = RecurrenceRule::new(Frequency::Weekly, anchor)
                .unwrap()
                .until(at(2023, 1, 11));
            let mut definition = RecurringTaskDefinition::new(Uuid::now_v7(), rule, anchor);
            definition.last_generated_at = Some(at(2023, 1, 4));
            let refreshed = refresh(&definition, at(2023, 1, 11));
            assert_eq!(refreshed.next_due_at, Some(at(2023, 1, 11)));

            // one more step crosses the bound and terminates
            let mut spent = refreshed.clone();
            spent.last_generated_at = Some(at(2023, 1, 11));
            spent.next_due_at = None;
            let terminal = refresh(&spent, at(2023, 1, 18));
            assert!(!terminal.active);
        }

        #[test]
        fn date_bound_is_checked_before_count_bound() {
            let anchor = at(2023, 1, 4);
            let rule = RecurrenceRule::new(Frequency::Weekly, anchor)
                .unwrap()
                .until(anchor - Duration::days(1))
                .limited_to(5);
            let definition = RecurringTaskDefinition::new(Uuid::now_v7(), rule, anchor);
            let refreshed = refresh(&definition, anchor);
            assert!(!refreshed.active);
        }

        #[test]
        fn count_bound_of_one_allows_a_single_occurrence() {
            let anchor = at(2023, 1, 4);
            let rule = RecurrenceRule::new(Frequency::Weekly, anchor)
                .unwrap()
                .limited_to(1);
            let definition = RecurringTaskDefinition::new(Uuid::now_v7(), rule, anchor);

            let refreshed = refresh(&definition, anchor);
            assert_eq!(refreshed.next_due_at, Some(anchor));

            let mut generated = refreshed.clone();
            generated.last_generated_at = Some(anchor);
            generated.next_due_at = None;
            let terminal = refresh(&generated, at(2023, 1, 11));
            assert!(!terminal.active);
            assert_eq!(terminal.next_due_at, None);
        }

        #[test]
        fn count_bound_of_zero_never_fires() {
            let anchor = at(2023, 1, 4);
            let rule = RecurrenceRule::new(Frequency::Weekly, anchor)
                .unwrap()
                .limited_to(0);
            let definition = RecurringTaskDefinition::new(Uuid::now_v7(), rule, anchor);
            let refreshed = refresh(&definition, anchor);
            assert!(!refreshed.active);
        }
    }

    mod generate_tests {
        use super::*;

        #[test]
        fn generation_copies_the_template_and_advances_the_definition() {
            let anchor = at(2023, 1, 4);
            let definition = refresh(&weekly_definition(anchor), anchor);
            let templates = template_for(&definition);

            let outcome = generate(&definition, &templates, anchor).unwrap();
            assert_eq!(outcome.instance.title, "Water the plants");
            assert_eq!(outcome.instance.priority, TaskPriority::Low);
            assert_eq!(outcome.instance.tags, vec!["home", "weekly"]);
            assert_eq!(outcome.instance.due_at, anchor);
            assert_eq!(outcome.instance.status, TaskStatus::NotStarted);
            assert_eq!(outcome.instance.definition_id, definition.id);

            assert_eq!(outcome.definition.last_generated_at, Some(anchor));
            assert_eq!(outcome.definition.next_due_at, None);
            assert!(outcome.definition.active);
        }

        #[test]
        fn late_generation_is_due_at_the_scheduled_date_not_now() {
            let anchor = at(2023, 1, 4);
            let definition = refresh(&weekly_definition(anchor), anchor);
            let templates = template_for(&definition);

            let late = at(2023, 1, 6);
            let outcome = generate(&definition, &templates, late).unwrap();
            assert_eq!(outcome.instance.due_at, anchor);
            assert_eq!(outcome.definition.last_generated_at, Some(late));
        }

        #[test]
        fn inactive_definition_fails_loudly() {
            let anchor = at(2023, 1, 4);
            let definition = weekly_definition(anchor).deactivated(anchor);
            let templates = template_for(&definition);
            let result = generate(&definition, &templates, anchor);
            assert!(matches!(result, Err(CoreError::DefinitionInactive(id)) if id == definition.id));
        }

        #[test]
        fn unrefreshed_definition_is_not_yet_due() {
            let anchor = at(2023, 1, 4);
            let definition = weekly_definition(anchor);
            let templates = template_for(&definition);
            let result = generate(&definition, &templates, anchor);
            assert!(matches!(result, Err(CoreError::NotYetDue(_))));
        }

        #[test]
        fn future_due_date_is_not_yet_due() {
            let anchor = at(2023, 1, 4);
            let definition = refresh(&weekly_definition(anchor), anchor);
            let templates = template_for(&definition);
            let result = generate(&definition, &templates, anchor - Duration::hours(1));
            assert!(matches!(result, Err(CoreError::NotYetDue(_))));
        }

        #[test]
        fn missing_template_surfaces_as_unavailable() {
            let anchor = at(2023, 1, 4);
            let definition = refresh(&weekly_definition(anchor), anchor);
            let templates: HashMap<Uuid, TaskTemplate> = HashMap::new();
            let result = generate(&definition, &templates, anchor);
            assert!(
                matches!(result, Err(CoreError::TemplateUnavailable(id)) if id == definition.template_id)
            );
        }
    }

    mod sweep_tests {
        use super::*;

        #[test]
        fn default_sweep_refreshes_without_materializing() {
            let anchor = at(2023, 1, 4);
            let definition = weekly_definition(anchor);
            let templates = template_for(&definition);

            let outcome = SweepManager::with_defaults().sweep(&[definition], &templates, anchor);
            assert_eq!(outcome.summary.definitions_processed, 1);
            assert_eq!(outcome.summary.due, 1);
            assert_eq!(outcome.summary.instances_created, 0);
            assert!(outcome.instances.is_empty());
            assert_eq!(outcome.definitions[0].next_due_at, Some(anchor));
        }

        #[test]
        fn materializing_sweep_generates_due_instances_and_reports_errors() {
            let anchor = at(2023, 1, 4);
            let due = weekly_definition(anchor);
            let orphaned = weekly_definition(anchor);
            let upcoming = weekly_definition(at(2023, 6, 1));
            let templates = template_for(&due);

            let manager = SweepManager::new(SweepConfig {
                materialize_due: true,
                ..SweepConfig::default()
            });
            let outcome = manager.sweep(
                &[due.clone(), orphaned.clone(), upcoming],
                &templates,
                anchor,
            );

            assert_eq!(outcome.summary.definitions_processed, 3);
            assert_eq!(outcome.summary.due, 2);
            assert_eq!(outcome.summary.instances_created, 1);
            assert_eq!(outcome.instances.len(), 1);
            assert_eq!(outcome.instances[0].definition_id, due.id);
            assert_eq!(outcome.summary.errors.len(), 1);
            assert!(outcome.summary.errors[0].contains("Template not found"));

            // the generating definition leaves the sweep with its next week set
            let swept_due = outcome
                .definitions
                .iter()
                .find(|d| d.id == due.id)
                .unwrap();
            assert_eq!(swept_due.next_due_at, Some(at(2023, 1, 11)));
        }

        #[test]
        fn batch_size_caps_materialization_per_sweep() {
            let anchor = at(2023, 1, 4);
            let first = weekly_definition(anchor);
            let second = weekly_definition(anchor);
            let mut templates = template_for(&first);
            templates.extend(template_for(&second));

            let manager = SweepManager::new(SweepConfig {
                max_batch_size: 1,
                materialize_due: true,
            });
            let outcome = manager.sweep(&[first, second], &templates, anchor);
            assert_eq!(outcome.summary.instances_created, 1);
            assert_eq!(outcome.summary.due, 2);
        }

        #[test]
        fn sweep_counts_terminal_transitions() {
            let anchor = at(2023, 1, 4);
            let rule = RecurrenceRule::new(Frequency::Weekly, anchor)
                .unwrap()
                .until(anchor - Duration::days(1));
            let doomed = RecurringTaskDefinition::new(Uuid::now_v7(), rule, anchor);
            let templates: HashMap<Uuid, TaskTemplate> = HashMap::new();

            let outcome = SweepManager::with_defaults().sweep(&[doomed], &templates, anchor);
            assert_eq!(outcome.summary.deactivated, 1);
            assert!(!outcome.definitions[0].active);
        }
    }
}
