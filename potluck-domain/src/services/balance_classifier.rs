use indexmap::IndexMap;

use crate::{
    error::SettlementError,
    model::{Money, ParticipantKey},
};

/// What a participant paid and consumed over one pass.
#[derive(Clone, Debug, PartialEq)]
pub struct ParticipantLedger {
    pub key: ParticipantKey,
    pub paid: Money,
    pub consumed: Money,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ParticipantBalance {
    pub key: ParticipantKey,
    pub balance: Money,
}

/// Net balances with the owed / owing sides split out and ordered for matching.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Classification {
    pub balances: IndexMap<ParticipantKey, Money>,
    /// Ascending: smallest credit first.
    pub creditors: Vec<ParticipantBalance>,
    /// Ascending: largest debt first.
    pub debtors: Vec<ParticipantBalance>,
}

pub struct BalanceClassifier {
    epsilon: Money,
}

impl BalanceClassifier {
    pub fn new(epsilon: Money) -> Self {
        Self {
            epsilon: epsilon.abs(),
        }
    }

    /// `balance = paid - (consumed + participation_fee)` for each ledger, in order.
    pub fn classify<I>(
        &self,
        ledgers: I,
        participation_fee: Money,
    ) -> Result<Classification, SettlementError>
    where
        I: IntoIterator<Item = ParticipantLedger>,
    {
        let mut classification = Classification::default();

        for ledger in ledgers {
            let balance = ledger
                .consumed
                .checked_add(participation_fee)
                .and_then(|owed| ledger.paid.checked_sub(owed))
                .ok_or_else(|| SettlementError::amount_overflow("balances"))?;
            classification.balances.insert(ledger.key.clone(), balance);

            let entry = ParticipantBalance {
                key: ledger.key,
                balance,
            };
            if balance > self.epsilon {
                classification.creditors.push(entry);
            } else if balance < -self.epsilon {
                classification.debtors.push(entry);
            }
        }

        // stable: equal balances keep event order
        classification.creditors.sort_by(|a, b| a.balance.cmp(&b.balance));
        classification.debtors.sort_by(|a, b| a.balance.cmp(&b.balance));

        Ok(classification)
    }
}

impl Default for BalanceClassifier {
    fn default() -> Self {
        Self::new(crate::services::CLASSIFICATION_EPSILON)
    }
}
