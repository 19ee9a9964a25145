use indexmap::IndexMap;
use rust_decimal::Decimal;

use crate::{
    error::SettlementError,
    model::{CategoryKey, Identified, Money, Participant, ParticipantKey},
    services::CategoryAggregation,
    table::LookupTable,
};

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Allocation {
    pub fee_pool: Money,
    /// Category spend minus its proportional share of the fee pool. May be negative.
    pub adjusted_expense_per_category: IndexMap<CategoryKey, Money>,
    /// Fee-adjusted consumption, one entry per participant in event order.
    pub consumed_per_participant: IndexMap<ParticipantKey, Money>,
    /// Adjusted cost of categories nobody consumed; charged to no one.
    pub unallocated: Money,
}

/// Nets the participation-fee pool out of every category in proportion to its
/// spend, then splits what is left equally among the category's consumers.
pub struct FeeAdjustedAllocator;

impl FeeAdjustedAllocator {
    pub fn allocate(
        &self,
        aggregation: &CategoryAggregation,
        participation_fee: Money,
        participants: &LookupTable<Participant>,
    ) -> Result<Allocation, SettlementError> {
        let fee_pool = participation_fee
            .checked_mul(Decimal::from(participants.len()))
            .ok_or_else(|| SettlementError::amount_overflow("fee pool"))?;
        let total_expenses = aggregation
            .total_expenses()
            .ok_or_else(|| SettlementError::amount_overflow("total expense"))?;
        let category_count = aggregation.total_expense_per_category.len();

        if category_count > 0 && total_expenses.is_zero() {
            tracing::error!(
                reject_reason = "zero_total_expense",
                category_count,
                participant_count = participants.len(),
                fee_pool = %fee_pool,
                "Fee allocation rejected: no spend to apportion the fee pool over"
            );
            return Err(SettlementError::ZeroTotalExpense {
                category_count,
                fee_pool,
            });
        }

        let mut consumed_per_participant: IndexMap<ParticipantKey, Money> = participants
            .iter()
            .map(|participant| (participant.key(), Money::ZERO))
            .collect();
        let mut adjusted_expense_per_category = IndexMap::with_capacity(category_count);
        let mut unallocated = Money::ZERO;

        for (category, &expense) in &aggregation.total_expense_per_category {
            let proportion = expense.ratio_of(total_expenses).unwrap_or(Decimal::ZERO);
            let adjusted = fee_pool
                .checked_mul(proportion)
                .and_then(|subsidy| expense.checked_sub(subsidy))
                .ok_or_else(|| SettlementError::amount_overflow("adjusted expenses"))?;
            adjusted_expense_per_category.insert(category.clone(), adjusted);

            let consumers = aggregation
                .consumers_per_category
                .get(category)
                .map(Vec::as_slice)
                .unwrap_or_default();
            let Some(share) = adjusted.split(consumers.len()) else {
                if !adjusted.is_zero() {
                    tracing::warn!(
                        category = %category,
                        adjusted = %adjusted,
                        "Category has no consumers; its adjusted cost is not charged"
                    );
                }
                unallocated = unallocated
                    .checked_add(adjusted)
                    .ok_or_else(|| SettlementError::amount_overflow("unallocated cost"))?;
                continue;
            };

            for consumer in consumers {
                let consumed = consumed_per_participant
                    .entry(consumer.clone())
                    .or_insert(Money::ZERO);
                *consumed = consumed
                    .checked_add(share)
                    .ok_or_else(|| SettlementError::amount_overflow("consumed shares"))?;
            }
        }

        Ok(Allocation {
            fee_pool,
            adjusted_expense_per_category,
            consumed_per_participant,
            unallocated,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Category;
    use crate::services::CategoryAggregator;
    use rstest::rstest;

    struct Fixture {
        categories: LookupTable<Category>,
        participants: LookupTable<Participant>,
    }

    impl Fixture {
        fn new(categories: &[&str]) -> Self {
            Self {
                categories: categories.iter().copied().map(Category::new).collect(),
                participants: LookupTable::new(),
            }
        }

        fn participant(mut self, name: &str, paid: &[(&str, i64)], consumed: &[&str]) -> Self {
            let mut participant = Participant::new(name);
            for &(category, amount) in paid {
                participant.record_expense(CategoryKey::name(category), Money::from_i64(amount));
            }
            participant.set_consumed_categories(consumed.iter().copied().map(CategoryKey::name));
            self.participants
                .insert(participant)
                .expect("unique participant names");
            self
        }

        fn allocate(&self, fee: Money) -> Result<Allocation, SettlementError> {
            let aggregation = CategoryAggregator.aggregate(&self.categories, &self.participants)?;
            FeeAdjustedAllocator.allocate(&aggregation, fee, &self.participants)
        }
    }

    fn consumed(allocation: &Allocation, name: &str) -> Money {
        allocation.consumed_per_participant[&ParticipantKey::name(name)]
    }

    #[test]
    fn single_category_subsidy() {
        let allocation = Fixture::new(&["Food"])
            .participant("Alice", &[("Food", 100)], &["Food"])
            .participant("Bob", &[], &["Food"])
            .allocate(Money::from_i64(10))
            .expect("allocation succeeds");

        assert_eq!(allocation.fee_pool, Money::from_i64(20));
        assert_eq!(
            allocation.adjusted_expense_per_category[&CategoryKey::name("Food")],
            Money::from_i64(80)
        );
        assert_eq!(consumed(&allocation, "Alice"), Money::from_i64(40));
        assert_eq!(consumed(&allocation, "Bob"), Money::from_i64(40));
    }

    #[rstest]
    #[case::no_fee(Money::ZERO, Money::from_i64(50))]
    #[case::with_fee(Money::from_i64(5), Money::from_i64(45))]
    fn shares_split_equally(#[case] fee: Money, #[case] expected_share: Money) {
        let allocation = Fixture::new(&["Food"])
            .participant("Alice", &[("Food", 100)], &["Food"])
            .participant("Bob", &[], &["Food"])
            .allocate(fee)
            .expect("allocation succeeds");

        assert_eq!(consumed(&allocation, "Alice"), expected_share);
        assert_eq!(consumed(&allocation, "Bob"), expected_share);
    }

    #[test]
    fn subsidy_follows_spend_proportion() {
        let allocation = Fixture::new(&["Food", "Drinks"])
            .participant("Alice", &[("Food", 300)], &["Food"])
            .participant("Bob", &[("Drinks", 100)], &["Drinks"])
            .allocate(Money::from_i64(20))
            .expect("allocation succeeds");

        // pool 40: Food carries 30, Drinks 10
        assert_eq!(
            allocation.adjusted_expense_per_category[&CategoryKey::name("Food")],
            Money::from_i64(270)
        );
        assert_eq!(
            allocation.adjusted_expense_per_category[&CategoryKey::name("Drinks")],
            Money::from_i64(90)
        );
    }

    #[test]
    fn adjusted_expense_may_go_negative() {
        let allocation = Fixture::new(&["Snacks"])
            .participant("Alice", &[("Snacks", 10)], &["Snacks"])
            .participant("Bob", &[], &["Snacks"])
            .allocate(Money::from_i64(20))
            .expect("allocation succeeds");

        assert_eq!(
            allocation.adjusted_expense_per_category[&CategoryKey::name("Snacks")],
            Money::from_i64(-30)
        );
        assert_eq!(consumed(&allocation, "Alice"), Money::from_i64(-15));
    }

    #[test]
    fn zero_consumer_category_is_charged_to_nobody() {
        let allocation = Fixture::new(&["Food", "Decorations"])
            .participant("Alice", &[("Food", 100), ("Decorations", 100)], &["Food"])
            .participant("Bob", &[], &["Food"])
            .allocate(Money::from_i64(10))
            .expect("allocation succeeds");

        assert_eq!(consumed(&allocation, "Alice"), Money::from_i64(45));
        assert_eq!(consumed(&allocation, "Bob"), Money::from_i64(45));
        assert_eq!(allocation.unallocated, Money::from_i64(90));
    }

    #[test]
    fn non_consumers_get_zero_entry() {
        let allocation = Fixture::new(&["Food"])
            .participant("Alice", &[("Food", 100)], &["Food"])
            .participant("Eve", &[], &[])
            .allocate(Money::ZERO)
            .expect("allocation succeeds");

        assert_eq!(consumed(&allocation, "Eve"), Money::ZERO);
        assert_eq!(consumed(&allocation, "Alice"), Money::from_i64(100));
    }

    #[test]
    fn zero_total_expense_is_rejected() {
        let result = Fixture::new(&["Food"])
            .participant("Alice", &[], &["Food"])
            .allocate(Money::from_i64(10));

        assert_eq!(
            result,
            Err(SettlementError::ZeroTotalExpense {
                category_count: 1,
                fee_pool: Money::from_i64(10),
            })
        );
    }

    #[test]
    fn no_categories_allocates_nothing() {
        let allocation = Fixture::new(&[])
            .participant("Alice", &[], &[])
            .allocate(Money::from_i64(10))
            .expect("allocation succeeds");

        assert!(allocation.adjusted_expense_per_category.is_empty());
        assert_eq!(consumed(&allocation, "Alice"), Money::ZERO);
    }

    #[test]
    fn fee_pool_overflow_is_rejected() {
        let result = Fixture::new(&["Food"])
            .participant("Alice", &[("Food", 100)], &["Food"])
            .participant("Bob", &[], &["Food"])
            .allocate(Money::from_decimal(Decimal::MAX));

        assert_eq!(
            result,
            Err(SettlementError::AmountOverflow { stage: "fee pool" })
        );
    }

    #[test]
    fn consumed_share_overflow_is_rejected() {
        let spend = Money::from_decimal(Decimal::from_i128_with_scale(2 * 10i128.pow(28), 0));
        let mut fixture = Fixture::new(&["Food", "Drinks"]);
        let mut alice = Participant::new("Alice");
        alice.record_expense(CategoryKey::name("Food"), spend);
        alice.set_consumed_categories([CategoryKey::name("Food"), CategoryKey::name("Drinks")]);
        fixture.participants.insert(alice).expect("unique participant names");
        let mut bob = Participant::new("Bob");
        bob.record_expense(CategoryKey::name("Drinks"), spend);
        fixture.participants.insert(bob).expect("unique participant names");

        // A negative fee doubles both adjusted costs; each fits, their sum does not.
        let result = fixture.allocate(-spend);

        assert_eq!(
            result,
            Err(SettlementError::AmountOverflow {
                stage: "consumed shares"
            })
        );
    }
}
