use thiserror::Error;

use crate::model::{CategoryKey, Money, ParticipantKey};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SettlementError {
    /// Every category is present but nothing was spent, so the fee pool has no
    /// proportion to follow.
    #[error(
        "Total expense across {category_count} categories is zero; cannot apportion fee pool of {fee_pool}"
    )]
    ZeroTotalExpense {
        category_count: usize,
        fee_pool: Money,
    },
    /// An intermediate amount left the range a decimal can hold.
    #[error("Amounts overflow while computing the {stage}")]
    AmountOverflow { stage: &'static str },
}

impl SettlementError {
    pub(crate) fn amount_overflow(stage: &'static str) -> Self {
        tracing::error!(
            reject_reason = "amount_overflow",
            stage,
            "Settlement pass rejected: amounts exceed the decimal range"
        );
        Self::AmountOverflow { stage }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EventEditError {
    #[error("Unknown category {0}")]
    UnknownCategory(CategoryKey),
    #[error("Unknown participant {0}")]
    UnknownParticipant(ParticipantKey),
    #[error("Category {0} already exists")]
    DuplicateCategory(CategoryKey),
    #[error("Participant {0} already exists")]
    DuplicateParticipant(ParticipantKey),
    #[error("Category {category} is still referenced by participant {participant}")]
    CategoryInUse {
        category: CategoryKey,
        participant: ParticipantKey,
    },
}
