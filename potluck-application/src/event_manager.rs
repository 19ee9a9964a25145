use std::sync::atomic::{AtomicU64, Ordering};

use chrono::NaiveDate;
use dashmap::DashMap;
use potluck_domain::{Event, EventEditError, EventId, Money, SettlementEngine};

use crate::{
    dto::EventSummaryDto, error::ApplicationError, mapper::EventMapper,
    report::SettlementReport,
};

const NO_CURRENT_EVENT: u64 = 0;

/// Holds every open event. Each event is edited and settled under its own
/// exclusive entry guard, so work on one event never blocks another.
pub struct EventManager {
    events: DashMap<EventId, Event>,
    next_id: AtomicU64,
    current: AtomicU64,
    engine: SettlementEngine,
}

impl EventManager {
    pub fn new(engine: SettlementEngine) -> Self {
        Self {
            events: DashMap::new(),
            next_id: AtomicU64::new(1),
            current: AtomicU64::new(NO_CURRENT_EVENT),
            engine,
        }
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Creates an empty event and makes it current.
    pub fn create_event(
        &self,
        name: impl Into<String>,
        participation_fee: Money,
        date: NaiveDate,
    ) -> EventId {
        self.insert_event(Event::new(name, participation_fee, date))
    }

    /// Stores `event` under a fresh id and makes it current.
    pub fn insert_event(&self, mut event: Event) -> EventId {
        let id = EventId(self.next_id.fetch_add(1, Ordering::Relaxed));
        event.assign_id(id);
        tracing::info!(event_id = %id, name = event.name(), "Event created");
        self.events.insert(id, event);
        self.current.store(id.0, Ordering::Release);
        id
    }

    pub fn set_current(&self, id: EventId) -> Result<(), ApplicationError> {
        if !self.events.contains_key(&id) {
            return Err(ApplicationError::UnknownEvent(id));
        }
        self.current.store(id.0, Ordering::Release);
        Ok(())
    }

    pub fn current_id(&self) -> Result<EventId, ApplicationError> {
        match self.current.load(Ordering::Acquire) {
            NO_CURRENT_EVENT => Err(ApplicationError::NoCurrentEvent),
            id => Ok(EventId(id)),
        }
    }

    /// A snapshot of the event; later edits are not reflected in it.
    pub fn get(&self, id: EventId) -> Result<Event, ApplicationError> {
        self.events
            .get(&id)
            .map(|entry| entry.value().clone())
            .ok_or(ApplicationError::UnknownEvent(id))
    }

    pub fn current_event(&self) -> Result<Event, ApplicationError> {
        self.get(self.current_id()?)
    }

    /// Summaries of all events in creation order.
    pub fn summaries(&self) -> Vec<EventSummaryDto> {
        let mut summaries: Vec<EventSummaryDto> = self
            .events
            .iter()
            .map(|entry| EventMapper.to_summary(*entry.key(), entry.value()))
            .collect();
        summaries.sort_by_key(|summary| summary.id);
        summaries
    }

    /// Runs `edit` while holding the event exclusively.
    pub fn edit<F, R>(&self, id: EventId, edit: F) -> Result<R, ApplicationError>
    where
        F: FnOnce(&mut Event) -> Result<R, EventEditError>,
    {
        let mut entry = self
            .events
            .get_mut(&id)
            .ok_or(ApplicationError::UnknownEvent(id))?;
        edit(entry.value_mut()).map_err(|err| {
            tracing::warn!(event_id = %id, error = %err, "Event edit rejected");
            ApplicationError::from(err)
        })
    }

    /// Settles the event in place and reports the result. Concurrent calls for
    /// the same event run one after another.
    pub fn settle(&self, id: EventId) -> Result<SettlementReport, ApplicationError> {
        let mut entry = self
            .events
            .get_mut(&id)
            .ok_or(ApplicationError::UnknownEvent(id))?;
        let event = entry.value_mut();
        let debt_count = event.compute_settlement(&self.engine)?.len();
        tracing::debug!(event_id = %id, debt_count, "Event settled");
        Ok(SettlementReport::from_event(event))
    }

    /// Removes the event, clearing the current selection if it pointed there.
    pub fn remove(&self, id: EventId) -> Result<Event, ApplicationError> {
        let (_, event) = self
            .events
            .remove(&id)
            .ok_or(ApplicationError::UnknownEvent(id))?;
        let _ = self.current.compare_exchange(
            id.0,
            NO_CURRENT_EVENT,
            Ordering::AcqRel,
            Ordering::Acquire,
        );
        tracing::info!(event_id = %id, name = event.name(), "Event removed");
        Ok(event)
    }
}

impl Default for EventManager {
    fn default() -> Self {
        Self::new(SettlementEngine::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use potluck_domain::{Category, CategoryKey, Participant, ParticipantKey};
    use rstest::{fixture, rstest};

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 18).expect("valid date")
    }

    #[fixture]
    fn manager() -> EventManager {
        EventManager::default()
    }

    #[rstest]
    fn new_events_become_current(manager: EventManager) {
        assert_eq!(manager.current_id(), Err(ApplicationError::NoCurrentEvent));

        let first = manager.create_event("Picnic", Money::ZERO, date());
        let second = manager.create_event("Dinner", Money::ZERO, date());

        assert_eq!(manager.current_id(), Ok(second));
        manager.set_current(first).expect("known event");
        assert_eq!(manager.current_event().map(|event| event.id()), Ok(Some(first)));
    }

    #[rstest]
    fn unknown_event_is_reported(manager: EventManager) {
        let missing = EventId(42);

        assert_eq!(manager.set_current(missing), Err(ApplicationError::UnknownEvent(missing)));
        assert_eq!(
            manager.settle(missing).map(|report| report.debts.len()),
            Err(ApplicationError::UnknownEvent(missing))
        );
    }

    #[rstest]
    fn summaries_follow_creation_order(manager: EventManager) {
        for name in ["A", "B", "C"] {
            manager.create_event(name, Money::ZERO, date());
        }

        let names: Vec<String> = manager
            .summaries()
            .into_iter()
            .map(|summary| summary.name)
            .collect();

        assert_eq!(names, ["A", "B", "C"]);
    }

    #[rstest]
    fn edit_errors_are_wrapped(manager: EventManager) {
        let id = manager.create_event("Picnic", Money::ZERO, date());

        let result = manager.edit(id, |event| event.remove_category(&CategoryKey::name("Gas")));

        assert_eq!(
            result.map(|_| ()),
            Err(ApplicationError::Edit(EventEditError::UnknownCategory(
                CategoryKey::name("Gas")
            )))
        );
    }

    #[rstest]
    fn settle_reports_debts(manager: EventManager) {
        let id = manager.create_event("Picnic", Money::ZERO, date());
        manager
            .edit(id, |event| {
                let food = event.add_category(Category::new("Food"))?;
                let alice = event.add_participant(Participant::new("Alice"))?;
                let bob = event.add_participant(Participant::new("Bob"))?;
                event.record_expense(&alice, &food, Money::from_i64(20))?;
                event.set_consumed_categories(&alice, [&food])?;
                event.set_consumed_categories(&bob, [&food])
            })
            .expect("edits succeed");

        let report = manager.settle(id).expect("settlement succeeds");

        assert_eq!(report.debts.len(), 1);
        assert_eq!(report.debts[0].to_string(), "Bob owes 10.00 to Alice");
        let stored = manager.get(id).expect("event present");
        assert_eq!(
            stored
                .participant(&ParticipantKey::name("Bob"))
                .map(Participant::balance),
            Some(Money::from_i64(-10))
        );
    }

    #[rstest]
    fn removing_current_event_clears_selection(manager: EventManager) {
        let kept = manager.create_event("Kept", Money::ZERO, date());
        let removed = manager.create_event("Removed", Money::ZERO, date());

        manager.remove(removed).expect("event present");

        assert_eq!(manager.current_id(), Err(ApplicationError::NoCurrentEvent));
        assert_eq!(manager.len(), 1);
        manager.set_current(kept).expect("known event");
        manager.remove(removed).expect_err("already removed");
        assert_eq!(manager.current_id(), Ok(kept));
    }
}
