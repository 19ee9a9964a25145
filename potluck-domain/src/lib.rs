#![warn(clippy::uninlined_format_args)]

pub mod error;
pub mod event;
pub mod model;
pub mod services;
pub mod table;

pub use error::{EventEditError, SettlementError};
pub use event::Event;
pub use model::{
    Category, CategoryId, CategoryKey, Debt, EntityKey, EventId, Identified, Money, NaturalKey,
    Participant, ParticipantId, ParticipantKey,
};
pub use services::{
    CLASSIFICATION_EPSILON, CONSERVATION_TOLERANCE, MIN_RECORDED_EXPENSE,
    SETTLEMENT_REMOVAL_TOLERANCE, SettlementEngine, SettlementOutcome, SettlementTolerances,
    ToleranceConfigError,
};
pub use table::LookupTable;
