use chrono::NaiveDate;
use indexmap::IndexMap;

use crate::{
    error::{EventEditError, SettlementError},
    model::{
        Category, CategoryId, CategoryKey, Debt, EventId, Identified, Money, Participant,
        ParticipantId, ParticipantKey,
    },
    services::{SettlementEngine, SettlementOutcome},
    table::LookupTable,
};

/// A shared-expense event: the aggregate every settlement pass runs over.
#[derive(Clone, Debug, PartialEq)]
pub struct Event {
    id: Option<EventId>,
    name: String,
    date: NaiveDate,
    participation_fee: Money,
    categories: LookupTable<Category>,
    participants: LookupTable<Participant>,
    debts: Vec<Debt>,
    total_expense_per_category: IndexMap<CategoryKey, Money>,
    consumers_per_category: IndexMap<CategoryKey, Vec<ParticipantKey>>,
    adjusted_expense_per_category: IndexMap<CategoryKey, Money>,
}

impl Event {
    pub fn new(name: impl Into<String>, participation_fee: Money, date: NaiveDate) -> Self {
        Self {
            id: None,
            name: name.into(),
            date,
            participation_fee,
            categories: LookupTable::new(),
            participants: LookupTable::new(),
            debts: Vec::new(),
            total_expense_per_category: IndexMap::new(),
            consumers_per_category: IndexMap::new(),
            adjusted_expense_per_category: IndexMap::new(),
        }
    }

    pub fn id(&self) -> Option<EventId> {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn participation_fee(&self) -> Money {
        self.participation_fee
    }

    pub fn categories(&self) -> &LookupTable<Category> {
        &self.categories
    }

    pub fn participants(&self) -> &LookupTable<Participant> {
        &self.participants
    }

    pub fn category(&self, key: &CategoryKey) -> Option<&Category> {
        self.categories.find(key)
    }

    pub fn participant(&self, key: &ParticipantKey) -> Option<&Participant> {
        self.participants.find(key)
    }

    /// Debts from the last settlement pass.
    pub fn debts(&self) -> &[Debt] {
        &self.debts
    }

    pub fn total_expense_per_category(&self) -> &IndexMap<CategoryKey, Money> {
        &self.total_expense_per_category
    }

    pub fn consumers_per_category(&self) -> &IndexMap<CategoryKey, Vec<ParticipantKey>> {
        &self.consumers_per_category
    }

    pub fn adjusted_expense_per_category(&self) -> &IndexMap<CategoryKey, Money> {
        &self.adjusted_expense_per_category
    }

    pub fn assign_id(&mut self, id: EventId) {
        self.id = Some(id);
    }

    pub fn rename(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn set_date(&mut self, date: NaiveDate) {
        self.date = date;
    }

    pub fn set_participation_fee(&mut self, participation_fee: Money) {
        self.participation_fee = participation_fee;
    }

    pub fn add_category(&mut self, category: Category) -> Result<CategoryKey, EventEditError> {
        self.categories
            .insert(category)
            .map(|index| self.categories.as_slice()[index].key())
            .map_err(|rejected| EventEditError::DuplicateCategory(rejected.key()))
    }

    pub fn rename_category(
        &mut self,
        key: &CategoryKey,
        name: impl Into<String>,
    ) -> Result<CategoryKey, EventEditError> {
        let name = name.into();
        self.edit_category_identity(key, |category| category.set_name(name))
    }

    /// Gives a category its stored id; participant references follow.
    pub fn assign_category_id(
        &mut self,
        key: &CategoryKey,
        id: CategoryId,
    ) -> Result<CategoryKey, EventEditError> {
        self.edit_category_identity(key, |category| category.set_id(id))
    }

    /// Removes an unused category. A category any participant still pays for or
    /// consumes is kept and reported.
    pub fn remove_category(&mut self, key: &CategoryKey) -> Result<Category, EventEditError> {
        let category = self
            .categories
            .find(key)
            .ok_or_else(|| EventEditError::UnknownCategory(key.clone()))?;
        let aliases = category.lookup_keys();
        if let Some(participant) = self
            .participants
            .iter()
            .find(|participant| participant.references_any(&aliases))
        {
            return Err(EventEditError::CategoryInUse {
                category: category.key(),
                participant: participant.key(),
            });
        }
        self.categories
            .remove(key)
            .ok_or_else(|| EventEditError::UnknownCategory(key.clone()))
    }

    /// Adds a participant whose expense and consumption references must all name
    /// categories of this event.
    pub fn add_participant(
        &mut self,
        mut participant: Participant,
    ) -> Result<ParticipantKey, EventEditError> {
        if let Some(unknown) = participant
            .expenses()
            .keys()
            .chain(participant.consumed_categories())
            .find(|category| !self.categories.contains(category))
        {
            return Err(EventEditError::UnknownCategory(unknown.clone()));
        }
        // references are stored under each category's current key
        for category in self.categories.iter().filter(|category| category.id().is_some()) {
            let canonical = category.key();
            let aliases: Vec<CategoryKey> = category
                .lookup_keys()
                .into_iter()
                .filter(|alias| *alias != canonical)
                .collect();
            participant.rekey_category(&aliases, &canonical);
        }
        self.participants
            .insert(participant)
            .map(|index| self.participants.as_slice()[index].key())
            .map_err(|rejected| EventEditError::DuplicateParticipant(rejected.key()))
    }

    pub fn rename_participant(
        &mut self,
        key: &ParticipantKey,
        name: impl Into<String>,
    ) -> Result<ParticipantKey, EventEditError> {
        let name = name.into();
        self.edit_participant_identity(key, |participant| participant.set_name(name))
    }

    pub fn assign_participant_id(
        &mut self,
        key: &ParticipantKey,
        id: ParticipantId,
    ) -> Result<ParticipantKey, EventEditError> {
        self.edit_participant_identity(key, |participant| participant.set_id(id))
    }

    pub fn remove_participant(
        &mut self,
        key: &ParticipantKey,
    ) -> Result<Participant, EventEditError> {
        self.participants
            .remove(key)
            .ok_or_else(|| EventEditError::UnknownParticipant(key.clone()))
    }

    /// Records a payment; returns `false` when the amount is below the recording floor.
    pub fn record_expense(
        &mut self,
        participant: &ParticipantKey,
        category: &CategoryKey,
        amount: Money,
    ) -> Result<bool, EventEditError> {
        let category = self.canonical_category(category)?;
        Ok(self
            .participant_mut(participant)?
            .record_expense(category, amount))
    }

    /// Overwrites a payment; amounts `<= 0` remove it.
    pub fn edit_expense(
        &mut self,
        participant: &ParticipantKey,
        category: &CategoryKey,
        amount: Money,
    ) -> Result<(), EventEditError> {
        let category = self.canonical_category(category)?;
        self.participant_mut(participant)?
            .set_expense(category, amount);
        Ok(())
    }

    pub fn add_consumed_category(
        &mut self,
        participant: &ParticipantKey,
        category: &CategoryKey,
    ) -> Result<bool, EventEditError> {
        let category = self.canonical_category(category)?;
        Ok(self
            .participant_mut(participant)?
            .add_consumed_category(category))
    }

    pub fn set_consumed_categories<'a, I>(
        &mut self,
        participant: &ParticipantKey,
        categories: I,
    ) -> Result<(), EventEditError>
    where
        I: IntoIterator<Item = &'a CategoryKey>,
    {
        let categories = categories
            .into_iter()
            .map(|category| self.canonical_category(category))
            .collect::<Result<Vec<_>, _>>()?;
        self.participant_mut(participant)?
            .set_consumed_categories(categories);
        Ok(())
    }

    /// Runs a settlement pass and merges its outcome into this event. On error the
    /// event keeps the results of the previous pass.
    pub fn compute_settlement(
        &mut self,
        engine: &SettlementEngine,
    ) -> Result<&[Debt], SettlementError> {
        let outcome = engine.compute(self)?;
        self.apply_outcome(outcome);
        Ok(&self.debts)
    }

    /// Writes a pass's derived values back: per-participant balance and
    /// consumption, the per-category maps, and the debt list.
    pub fn apply_outcome(&mut self, outcome: SettlementOutcome) {
        for participant in self.participants.iter_mut() {
            let key = participant.key();
            participant.set_balance(outcome.balances.get(&key).copied().unwrap_or_default());
            participant.set_total_consumed(
                outcome
                    .consumed_totals
                    .get(&key)
                    .copied()
                    .unwrap_or_default(),
            );
        }
        self.total_expense_per_category = outcome.category_totals;
        self.consumers_per_category = outcome.consumers;
        self.adjusted_expense_per_category = outcome.adjusted_expenses;
        self.debts = outcome.debts;
    }

    fn canonical_category(&self, key: &CategoryKey) -> Result<CategoryKey, EventEditError> {
        self.categories
            .find(key)
            .map(Identified::key)
            .ok_or_else(|| EventEditError::UnknownCategory(key.clone()))
    }

    fn participant_mut(
        &mut self,
        key: &ParticipantKey,
    ) -> Result<&mut Participant, EventEditError> {
        self.participants
            .position(key)
            .and_then(|index| self.participants.get_mut(index))
            .ok_or_else(|| EventEditError::UnknownParticipant(key.clone()))
    }

    fn edit_category_identity<F>(
        &mut self,
        key: &CategoryKey,
        edit: F,
    ) -> Result<CategoryKey, EventEditError>
    where
        F: FnOnce(&mut Category),
    {
        let index = self
            .categories
            .position(key)
            .ok_or_else(|| EventEditError::UnknownCategory(key.clone()))?;
        let aliases = self.categories.as_slice()[index].lookup_keys();
        let updated = self
            .categories
            .update(index, |category| {
                edit(category);
                category.clone()
            })
            .ok_or_else(|| EventEditError::DuplicateCategory(key.clone()))?;

        let new_key = updated.key();
        let stale: Vec<CategoryKey> = aliases
            .into_iter()
            .filter(|alias| *alias != new_key)
            .collect();
        if !stale.is_empty() {
            for participant in self.participants.iter_mut() {
                participant.rekey_category(&stale, &new_key);
            }
        }
        Ok(new_key)
    }

    fn edit_participant_identity<F>(
        &mut self,
        key: &ParticipantKey,
        edit: F,
    ) -> Result<ParticipantKey, EventEditError>
    where
        F: FnOnce(&mut Participant),
    {
        let index = self
            .participants
            .position(key)
            .ok_or_else(|| EventEditError::UnknownParticipant(key.clone()))?;
        self.participants
            .update(index, |participant| {
                edit(participant);
                participant.key()
            })
            .ok_or_else(|| EventEditError::DuplicateParticipant(key.clone()))
    }
}
