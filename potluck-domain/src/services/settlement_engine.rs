use indexmap::IndexMap;

use crate::{
    error::SettlementError,
    event::Event,
    model::{CategoryKey, Debt, Identified, Money, ParticipantKey},
    services::{
        BalanceClassifier, CategoryAggregator, FeeAdjustedAllocator, ParticipantLedger,
        SettlementMatcher, SettlementTolerances,
    },
};

/// Everything one settlement pass derives from an event snapshot, keyed by
/// entity identity.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SettlementOutcome {
    pub category_totals: IndexMap<CategoryKey, Money>,
    pub consumers: IndexMap<CategoryKey, Vec<ParticipantKey>>,
    pub adjusted_expenses: IndexMap<CategoryKey, Money>,
    pub consumed_totals: IndexMap<ParticipantKey, Money>,
    pub balances: IndexMap<ParticipantKey, Money>,
    pub debts: Vec<Debt>,
}

impl SettlementOutcome {
    /// Checked against overflow when the pass ran, so this sum cannot overflow.
    pub fn balance_sum(&self) -> Money {
        self.balances.values().sum()
    }
}

/// Runs aggregation, fee allocation, classification and matching in order.
#[derive(Clone, Copy, Debug, Default)]
pub struct SettlementEngine {
    tolerances: SettlementTolerances,
}

impl SettlementEngine {
    pub fn new(tolerances: SettlementTolerances) -> Self {
        Self { tolerances }
    }

    /// Computes a full settlement without touching `event`.
    pub fn compute(&self, event: &Event) -> Result<SettlementOutcome, SettlementError> {
        let categories = event.categories();
        let participants = event.participants();
        let participation_fee = event.participation_fee();

        tracing::debug!(
            event = event.name(),
            category_count = categories.len(),
            participant_count = participants.len(),
            participation_fee = %participation_fee,
            "Settlement pass started"
        );

        let aggregation = CategoryAggregator.aggregate(categories, participants)?;
        let allocation =
            FeeAdjustedAllocator.allocate(&aggregation, participation_fee, participants)?;

        let ledgers = participants
            .iter()
            .map(|participant| {
                let key = participant.key();
                let paid = Money::checked_sum(participant.expenses().values().copied())
                    .ok_or_else(|| SettlementError::amount_overflow("amounts paid"))?;
                let consumed = allocation
                    .consumed_per_participant
                    .get(&key)
                    .copied()
                    .unwrap_or(Money::ZERO);
                Ok(ParticipantLedger {
                    key,
                    paid,
                    consumed,
                })
            })
            .collect::<Result<Vec<_>, SettlementError>>()?;
        let classification = BalanceClassifier::new(self.tolerances.classification_epsilon)
            .classify(ledgers, participation_fee)?;

        let balance_sum = Money::checked_sum(classification.balances.values().copied())
            .ok_or_else(|| SettlementError::amount_overflow("balance sum"))?;
        if balance_sum.abs() > self.tolerances.conservation {
            tracing::warn!(
                event = event.name(),
                balance_sum = %balance_sum,
                unallocated = %allocation.unallocated,
                conservation_tolerance = %self.tolerances.conservation,
                "Balances do not sum to zero; some spend has no consumers"
            );
        }

        let debts = SettlementMatcher::new(self.tolerances.removal).settle(&classification);

        tracing::debug!(
            event = event.name(),
            creditor_count = classification.creditors.len(),
            debtor_count = classification.debtors.len(),
            debt_count = debts.len(),
            "Settlement pass finished"
        );

        Ok(SettlementOutcome {
            category_totals: aggregation.total_expense_per_category,
            consumers: aggregation.consumers_per_category,
            adjusted_expenses: allocation.adjusted_expense_per_category,
            consumed_totals: allocation.consumed_per_participant,
            balances: classification.balances,
            debts,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Category, Participant};
    use chrono::NaiveDate;
    use rstest::{fixture, rstest};

    #[fixture]
    fn engine() -> SettlementEngine {
        SettlementEngine::default()
    }

    fn event(fee: i64) -> Event {
        Event::new(
            "Picnic",
            Money::from_i64(fee),
            NaiveDate::from_ymd_opt(2024, 6, 1).expect("valid date"),
        )
    }

    #[rstest]
    fn two_people_one_category(engine: SettlementEngine) {
        let mut event = event(0);
        event.add_category(Category::new("Food")).expect("new category");
        let mut alice = Participant::new("Alice");
        alice.record_expense(CategoryKey::name("Food"), Money::from_i64(100));
        alice.add_consumed_category(CategoryKey::name("Food"));
        let mut bob = Participant::new("Bob");
        bob.add_consumed_category(CategoryKey::name("Food"));
        event.add_participant(alice).expect("new participant");
        event.add_participant(bob).expect("new participant");

        let outcome = engine.compute(&event).expect("settlement succeeds");

        let alice = ParticipantKey::name("Alice");
        let bob = ParticipantKey::name("Bob");
        assert_eq!(outcome.consumed_totals[&alice], Money::from_i64(50));
        assert_eq!(outcome.consumed_totals[&bob], Money::from_i64(50));
        assert_eq!(outcome.balances[&alice], Money::from_i64(50));
        assert_eq!(outcome.balances[&bob], Money::from_i64(-50));
        assert_eq!(outcome.debts, vec![Debt::new(bob, alice, Money::from_i64(50))]);
    }

    #[rstest]
    fn compute_does_not_mutate_event(engine: SettlementEngine) {
        let mut event = event(5);
        event.add_category(Category::new("Food")).expect("new category");
        let mut alice = Participant::new("Alice");
        alice.record_expense(CategoryKey::name("Food"), Money::from_i64(30));
        alice.add_consumed_category(CategoryKey::name("Food"));
        event.add_participant(alice).expect("new participant");
        event.add_participant(Participant::new("Bob")).expect("new participant");
        let before = event.clone();

        engine.compute(&event).expect("settlement succeeds");

        assert_eq!(event, before);
    }

    #[rstest]
    fn empty_event_settles_to_nothing(engine: SettlementEngine) {
        let outcome = engine.compute(&event(10)).expect("settlement succeeds");
        assert_eq!(outcome, SettlementOutcome::default());
    }

    #[rstest]
    fn overflowing_fee_pool_is_an_error(engine: SettlementEngine) {
        let mut event = Event::new(
            "Gala",
            Money::from_decimal(rust_decimal::Decimal::MAX),
            NaiveDate::from_ymd_opt(2024, 6, 1).expect("valid date"),
        );
        event.add_participant(Participant::new("Alice")).expect("new participant");
        event.add_participant(Participant::new("Bob")).expect("new participant");

        assert_eq!(
            engine.compute(&event),
            Err(SettlementError::AmountOverflow { stage: "fee pool" })
        );
    }

    #[rstest]
    fn overflowing_grand_total_is_an_error(engine: SettlementEngine) {
        let max = Money::from_decimal(rust_decimal::Decimal::MAX);
        let mut event = event(0);
        event.add_category(Category::new("Food")).expect("new category");
        event.add_category(Category::new("Drinks")).expect("new category");
        let mut alice = Participant::new("Alice");
        alice.record_expense(CategoryKey::name("Food"), max);
        alice.record_expense(CategoryKey::name("Drinks"), Money::from_i64(1));
        event.add_participant(alice).expect("new participant");

        // each category total fits; the grand total does not
        assert_eq!(
            engine.compute(&event),
            Err(SettlementError::AmountOverflow {
                stage: "total expense"
            })
        );
    }
}
