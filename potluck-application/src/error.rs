use potluck_domain::{EventEditError, EventId, SettlementError};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApplicationError {
    #[error("Unknown event {0}")]
    UnknownEvent(EventId),
    #[error("No current event is selected")]
    NoCurrentEvent,
    #[error("Participant '{participant}' references undeclared category '{category}'")]
    UndeclaredCategory {
        participant: String,
        category: String,
    },
    #[error(transparent)]
    Edit(#[from] EventEditError),
    #[error(transparent)]
    Settlement(#[from] SettlementError),
}
