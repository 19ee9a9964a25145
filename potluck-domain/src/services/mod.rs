pub mod balance_classifier;
pub mod category_aggregator;
pub mod fee_allocator;
pub mod settlement_engine;
pub mod settlement_matcher;
pub mod tolerances;

pub use balance_classifier::{
    BalanceClassifier, Classification, ParticipantBalance, ParticipantLedger,
};
pub use category_aggregator::{CategoryAggregation, CategoryAggregator};
pub use fee_allocator::{Allocation, FeeAdjustedAllocator};
pub use settlement_engine::{SettlementEngine, SettlementOutcome};
pub use settlement_matcher::SettlementMatcher;
pub use tolerances::{
    CLASSIFICATION_EPSILON, CLASSIFICATION_EPSILON_VAR, CONSERVATION_TOLERANCE,
    MIN_RECORDED_EXPENSE, REMOVAL_TOLERANCE_VAR, SETTLEMENT_REMOVAL_TOLERANCE,
    SettlementTolerances, ToleranceConfigError,
};
