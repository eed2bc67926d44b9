use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    #[error("Invalid recurrence rule: {0}")]
    InvalidRule(String),

    #[error("Definition {0} is inactive and produces no further occurrences")]
    DefinitionInactive(Uuid),

    #[error("Definition {0} has no occurrence due yet")]
    NotYetDue(Uuid),

    #[error("Template not found: {0}")]
    TemplateUnavailable(Uuid),
}
