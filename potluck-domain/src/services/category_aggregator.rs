use fxhash::FxHashSet;
use indexmap::IndexMap;

use crate::{
    error::SettlementError,
    model::{Category, CategoryKey, Identified, Money, Participant, ParticipantKey},
    table::LookupTable,
};

/// Per-category facts gathered from the participants.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CategoryAggregation {
    /// Spend per category, every event category present.
    pub total_expense_per_category: IndexMap<CategoryKey, Money>,
    /// Consumers per category in participant order, every event category present.
    pub consumers_per_category: IndexMap<CategoryKey, Vec<ParticipantKey>>,
}

impl CategoryAggregation {
    /// `None` when the category totals do not fit in one amount.
    pub fn total_expenses(&self) -> Option<Money> {
        Money::checked_sum(self.total_expense_per_category.values().copied())
    }
}

pub struct CategoryAggregator;

impl CategoryAggregator {
    /// References are resolved through `categories`, so a participant naming a
    /// category by id and by name is still counted once. References to unknown
    /// categories are skipped.
    pub fn aggregate(
        &self,
        categories: &LookupTable<Category>,
        participants: &LookupTable<Participant>,
    ) -> Result<CategoryAggregation, SettlementError> {
        let mut totals = vec![Money::ZERO; categories.len()];
        let mut consumers: Vec<Vec<ParticipantKey>> = vec![Vec::new(); categories.len()];

        for participant in participants {
            for (category, &amount) in participant.expenses() {
                if amount <= Money::ZERO {
                    continue;
                }
                if let Some(index) = categories.position(category) {
                    totals[index] = totals[index]
                        .checked_add(amount)
                        .ok_or_else(|| SettlementError::amount_overflow("category totals"))?;
                }
            }

            let consumed: FxHashSet<usize> = participant
                .consumed_categories()
                .iter()
                .filter_map(|category| categories.position(category))
                .collect();
            for index in consumed {
                consumers[index].push(participant.key());
            }
        }

        let total_expense_per_category = categories
            .iter()
            .map(Identified::key)
            .zip(totals)
            .collect();
        let consumers_per_category = categories
            .iter()
            .map(Identified::key)
            .zip(consumers)
            .collect();

        Ok(CategoryAggregation {
            total_expense_per_category,
            consumers_per_category,
        })
    }
}
