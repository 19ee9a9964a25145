use std::fmt::{self, Write};

use chrono::NaiveDate;
use potluck_domain::{Event, Money};

use crate::ports::NameDirectory;

#[derive(Debug, Clone, PartialEq)]
pub struct ParticipantLine {
    pub name: String,
    pub paid: Money,
    pub consumed: Money,
    pub balance: Money,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DebtLine {
    pub debtor: String,
    pub creditor: String,
    pub amount: Money,
}

impl fmt::Display for DebtLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} owes {} to {}", self.debtor, self.amount, self.creditor)
    }
}

/// Named, display-ready view of an event's last settlement pass.
#[derive(Debug, Clone, PartialEq)]
pub struct SettlementReport {
    pub event_name: String,
    pub date: NaiveDate,
    pub participation_fee: Money,
    pub participants: Vec<ParticipantLine>,
    pub debts: Vec<DebtLine>,
}

impl SettlementReport {
    pub fn from_event(event: &Event) -> Self {
        let participants = event
            .participants()
            .iter()
            .map(|participant| ParticipantLine {
                name: participant.name().to_owned(),
                paid: participant.total_expense(),
                consumed: participant.total_consumed(),
                balance: participant.balance(),
            })
            .collect();
        let debts = event
            .debts()
            .iter()
            .map(|debt| DebtLine {
                debtor: event.participant_label(debt.debtor()),
                creditor: event.participant_label(debt.creditor()),
                amount: debt.amount(),
            })
            .collect();

        Self {
            event_name: event.name().to_owned(),
            date: event.date(),
            participation_fee: event.participation_fee(),
            participants,
            debts,
        }
    }

    pub fn is_settled(&self) -> bool {
        self.debts.is_empty()
    }

    pub fn render(&self) -> String {
        let name_width = self
            .participants
            .iter()
            .map(|line| line.name.chars().count())
            .max()
            .unwrap_or(0)
            .max("Participant".len());

        let mut reply = String::with_capacity(256);
        let _ = writeln!(
            &mut reply,
            "{} ({}, participation fee {})",
            self.event_name, self.date, self.participation_fee
        );
        let _ = writeln!(
            &mut reply,
            "{:<name_width$}  {:>10}  {:>10}  {:>10}",
            "Participant", "Paid", "Consumed", "Balance"
        );
        for line in &self.participants {
            let sign = if line.balance.is_positive() { "+" } else { "" };
            let _ = writeln!(
                &mut reply,
                "{:<name_width$}  {:>10}  {:>10}  {:>10}",
                line.name,
                line.paid.to_string(),
                line.consumed.to_string(),
                format!("{sign}{}", line.balance)
            );
        }

        if self.debts.is_empty() {
            reply.push_str("Everyone is settled.\n");
        } else {
            reply.push_str("Debts:\n");
            for debt in &self.debts {
                let _ = writeln!(&mut reply, "- {debt}");
            }
        }
        reply
    }
}

impl fmt::Display for SettlementReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use potluck_domain::{Category, CategoryKey, Participant, SettlementEngine};

    fn settled_event() -> Event {
        let mut event = Event::new(
            "Lunch",
            Money::ZERO,
            NaiveDate::from_ymd_opt(2024, 2, 29).expect("valid date"),
        );
        event.add_category(Category::new("Food")).expect("new category");
        let mut alice = Participant::new("Alice");
        alice.record_expense(CategoryKey::name("Food"), Money::new(3050, 2));
        alice.add_consumed_category(CategoryKey::name("Food"));
        let mut bob = Participant::new("Bob");
        bob.add_consumed_category(CategoryKey::name("Food"));
        event.add_participant(alice).expect("new participant");
        event.add_participant(bob).expect("new participant");
        event
            .compute_settlement(&SettlementEngine::default())
            .expect("settlement succeeds");
        event
    }

    #[test]
    fn report_names_debtors() {
        let report = SettlementReport::from_event(&settled_event());

        assert_eq!(
            report.debts,
            vec![DebtLine {
                debtor: "Bob".to_owned(),
                creditor: "Alice".to_owned(),
                amount: Money::new(1525, 2),
            }]
        );
        assert!(!report.is_settled());
    }

    #[test]
    fn render_lists_table_and_debts() {
        let rendered = SettlementReport::from_event(&settled_event()).render();

        let expected = "\
Lunch (2024-02-29, participation fee 0.00)
Participant        Paid    Consumed     Balance
Alice             30.50       15.25      +15.25
Bob                0.00       15.25      -15.25
Debts:
- Bob owes 15.25 to Alice
";
        assert_eq!(rendered, expected);
    }

    #[test]
    fn empty_event_is_settled() {
        let event = Event::new(
            "Nothing",
            Money::ZERO,
            NaiveDate::from_ymd_opt(2024, 1, 1).expect("valid date"),
        );

        let report = SettlementReport::from_event(&event);

        assert!(report.is_settled());
        assert!(report.render().ends_with("Everyone is settled.\n"));
    }
}
