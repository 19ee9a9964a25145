use potluck_domain::{Category, CategoryKey, Event, EventId, Money, Participant};

use crate::{
    dto::{
        CategoryDto, DebtDto, EventDto, EventResultDto, EventSummaryDto, ParticipantDto,
        ParticipantResultDto,
    },
    error::ApplicationError,
    ports::NameDirectory,
};

/// Converts between wire DTOs and the domain event.
pub struct EventMapper;

impl EventMapper {
    /// Builds a domain event from its DTO. Every category a participant pays for
    /// or consumes must be declared in `categories`.
    pub fn to_domain(&self, dto: &EventDto) -> Result<Event, ApplicationError> {
        let mut event = Event::new(
            dto.name.clone(),
            Money::from_decimal(dto.participation_fee),
            dto.date,
        );
        for category in &dto.categories {
            event.add_category(Category::new(category.name.clone()))?;
        }
        for participant in &dto.participants {
            let participant = self.participant_to_domain(&event, participant)?;
            event.add_participant(participant)?;
        }
        Ok(event)
    }

    fn participant_to_domain(
        &self,
        event: &Event,
        dto: &ParticipantDto,
    ) -> Result<Participant, ApplicationError> {
        let declared = |name: &String| {
            let key = CategoryKey::name(name.as_str());
            if event.category(&key).is_some() {
                Ok(key)
            } else {
                Err(ApplicationError::UndeclaredCategory {
                    participant: dto.name.clone(),
                    category: name.clone(),
                })
            }
        };

        let mut participant = Participant::new(dto.name.clone());
        if let Some(phone) = &dto.phone {
            participant = participant.with_phone(phone.clone());
        }
        if let Some(email) = &dto.email {
            participant = participant.with_email(email.clone());
        }

        for (category, &amount) in &dto.expenses {
            let key = declared(category)?;
            if !participant.record_expense(key, Money::from_decimal(amount)) {
                tracing::debug!(
                    participant = %dto.name,
                    category = %category,
                    amount = %amount,
                    "Expense below the recording floor ignored"
                );
            }
        }
        let consumed = dto
            .consumed_categories
            .iter()
            .map(declared)
            .collect::<Result<Vec<_>, _>>()?;
        participant.set_consumed_categories(consumed);

        Ok(participant)
    }

    pub fn to_dto(&self, event: &Event) -> EventDto {
        EventDto {
            name: event.name().to_owned(),
            date: event.date(),
            participation_fee: event.participation_fee().as_decimal(),
            categories: event
                .categories()
                .iter()
                .map(|category| CategoryDto::new(category.name()))
                .collect(),
            participants: event
                .participants()
                .iter()
                .map(|participant| ParticipantDto {
                    name: participant.name().to_owned(),
                    phone: participant.phone().map(str::to_owned),
                    email: participant.email().map(str::to_owned),
                    consumed_categories: participant
                        .consumed_categories()
                        .iter()
                        .map(|key| event.category_label(key))
                        .collect(),
                    expenses: participant
                        .expenses()
                        .iter()
                        .map(|(key, amount)| (event.category_label(key), amount.as_decimal()))
                        .collect(),
                })
                .collect(),
        }
    }

    pub fn to_summary(&self, id: EventId, event: &Event) -> EventSummaryDto {
        EventSummaryDto {
            id: id.0,
            name: event.name().to_owned(),
            date: event.date(),
        }
    }

    /// The event with the results of its last settlement pass, amounts in cents.
    pub fn to_result(&self, event: &Event) -> EventResultDto {
        EventResultDto {
            event: self.to_dto(event),
            participants: event
                .participants()
                .iter()
                .map(|participant| ParticipantResultDto {
                    name: participant.name().to_owned(),
                    paid: participant.total_expense().to_cents(),
                    consumed: participant.total_consumed().to_cents(),
                    balance: participant.balance().to_cents(),
                })
                .collect(),
            debts: event
                .debts()
                .iter()
                .map(|debt| DebtDto {
                    from: event.participant_label(debt.debtor()),
                    to: event.participant_label(debt.creditor()),
                    amount: debt.amount().to_cents(),
                })
                .collect(),
        }
    }
}
