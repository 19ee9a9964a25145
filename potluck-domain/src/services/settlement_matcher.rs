use crate::{
    model::{Debt, Money},
    services::{Classification, SETTLEMENT_REMOVAL_TOLERANCE},
};

/// Greedy two-queue settlement over classified balances.
pub struct SettlementMatcher {
    removal_tolerance: Money,
}

impl SettlementMatcher {
    pub fn new(removal_tolerance: Money) -> Self {
        Self { removal_tolerance }
    }

    /// Matches the head debtor against the head creditor until either queue is
    /// empty. Each step moves `min(credit, debt)`; a participant leaves its queue
    /// once its remaining balance is zero or within the removal tolerance of it,
    /// so every step retires at least one participant.
    ///
    /// Works on copies; the balances in `classification` are only read.
    pub fn settle(&self, classification: &Classification) -> Vec<Debt> {
        let creditors = &classification.creditors;
        let debtors = &classification.debtors;

        let mut credit: Vec<Money> = creditors.iter().map(|entry| entry.balance).collect();
        let mut debt: Vec<Money> = debtors.iter().map(|entry| entry.balance).collect();
        let mut debts = Vec::with_capacity(creditors.len() + debtors.len());

        let (mut creditor_idx, mut debtor_idx) = (0, 0);
        while creditor_idx < creditors.len() && debtor_idx < debtors.len() {
            let amount = credit[creditor_idx].min(-debt[debtor_idx]);

            debts.push(Debt::new(
                debtors[debtor_idx].key.clone(),
                creditors[creditor_idx].key.clone(),
                amount,
            ));

            credit[creditor_idx] -= amount;
            debt[debtor_idx] += amount;

            if self.is_settled(credit[creditor_idx]) {
                creditor_idx += 1;
            }
            if self.is_settled(debt[debtor_idx]) {
                debtor_idx += 1;
            }
        }

        debug_assert!(creditor_idx == creditors.len() || debtor_idx == debtors.len());
        debts
    }

    fn is_settled(&self, remaining: Money) -> bool {
        remaining.is_zero() || remaining.abs() < self.removal_tolerance
    }
}

impl Default for SettlementMatcher {
    fn default() -> Self {
        Self::new(SETTLEMENT_REMOVAL_TOLERANCE)
    }
}
