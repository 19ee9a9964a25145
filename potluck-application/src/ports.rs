use potluck_domain::{CategoryKey, Event, ParticipantKey};

/// Resolves entity keys to the names shown to people.
pub trait NameDirectory {
    fn participant_name(&self, key: &ParticipantKey) -> Option<&str>;

    fn category_name(&self, key: &CategoryKey) -> Option<&str>;

    /// The participant's name, or the key itself for someone no longer present.
    fn participant_label(&self, key: &ParticipantKey) -> String {
        self.participant_name(key)
            .map_or_else(|| key.to_string(), str::to_owned)
    }

    fn category_label(&self, key: &CategoryKey) -> String {
        self.category_name(key)
            .map_or_else(|| key.to_string(), str::to_owned)
    }
}

impl NameDirectory for Event {
    fn participant_name(&self, key: &ParticipantKey) -> Option<&str> {
        self.participant(key).map(|participant| participant.name())
    }

    fn category_name(&self, key: &CategoryKey) -> Option<&str> {
        self.category(key).map(|category| category.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use potluck_domain::{Category, CategoryId, EntityKey, Money, Participant};

    #[test]
    fn labels_fall_back_to_keys() {
        let mut event = Event::new(
            "Picnic",
            Money::ZERO,
            NaiveDate::from_ymd_opt(2024, 6, 1).expect("valid date"),
        );
        event
            .add_category(Category::new("Food").with_id(CategoryId(3)))
            .expect("new category");
        event
            .add_participant(Participant::new("Alice").with_phone("555-0100"))
            .expect("new participant");

        assert_eq!(event.category_label(&EntityKey::Assigned(CategoryId(3))), "Food");
        assert_eq!(event.participant_label(&ParticipantKey::phone("555-0100")), "Alice");
        assert_eq!(event.participant_label(&ParticipantKey::name("Ghost")), "'Ghost'");
    }
}
