use std::{
    fmt,
    hash::Hash,
    iter::Sum,
    ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign},
};

use indexmap::{IndexMap, IndexSet};
use rust_decimal::{Decimal, RoundingStrategy};

use crate::services::MIN_RECORDED_EXPENSE;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Money(Decimal);

impl Money {
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// `Money::new(1250, 2)` is 12.50.
    pub fn new(num: i64, scale: u32) -> Self {
        Self(Decimal::new(num, scale))
    }

    pub fn from_i64(value: i64) -> Self {
        Self(Decimal::from(value))
    }

    pub const fn from_decimal(value: Decimal) -> Self {
        Self(value)
    }

    pub fn as_decimal(self) -> Decimal {
        self.0
    }

    pub fn abs(self) -> Self {
        Self(self.0.abs())
    }

    pub fn is_zero(self) -> bool {
        self.0.is_zero()
    }

    /// Strictly greater than zero.
    pub fn is_positive(self) -> bool {
        self > Self::ZERO
    }

    /// Strictly less than zero.
    pub fn is_negative(self) -> bool {
        self < Self::ZERO
    }

    pub fn checked_add(self, rhs: Money) -> Option<Money> {
        self.0.checked_add(rhs.0).map(Self)
    }

    pub fn checked_sub(self, rhs: Money) -> Option<Money> {
        self.0.checked_sub(rhs.0).map(Self)
    }

    pub fn checked_mul(self, rhs: Decimal) -> Option<Money> {
        self.0.checked_mul(rhs).map(Self)
    }

    /// Sum that stops at `None` instead of overflowing.
    pub fn checked_sum<I>(amounts: I) -> Option<Money>
    where
        I: IntoIterator<Item = Money>,
    {
        amounts
            .into_iter()
            .try_fold(Self::ZERO, |total, amount| total.checked_add(amount))
    }

    /// Share of `self` in `total`. `None` when `total` is zero.
    pub fn ratio_of(self, total: Money) -> Option<Decimal> {
        self.0.checked_div(total.0)
    }

    /// Equal share of `self` across `parts` recipients.
    pub fn split(self, parts: usize) -> Option<Money> {
        if parts == 0 {
            return None;
        }
        self.0.checked_div(Decimal::from(parts)).map(Self)
    }

    /// Rounds half away from zero to two decimals for display.
    pub fn to_cents(self) -> Decimal {
        self.0
            .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.to_cents())
    }
}

impl Add for Money {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0;
    }
}

impl Sub for Money {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self(self.0 - rhs.0)
    }
}

impl SubAssign for Money {
    fn sub_assign(&mut self, rhs: Self) {
        self.0 -= rhs.0;
    }
}

impl Neg for Money {
    type Output = Self;

    fn neg(self) -> Self::Output {
        Self(-self.0)
    }
}

impl Mul<Decimal> for Money {
    type Output = Self;

    fn mul(self, rhs: Decimal) -> Self::Output {
        Self(self.0 * rhs)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Add::add)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Self {
        iter.copied().sum()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EventId(pub u64);

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CategoryId(pub u64);

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ParticipantId(pub u64);

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl fmt::Display for CategoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// How an entity is looked up: by its stored id once one has been assigned,
/// otherwise by its natural key.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum EntityKey<Id, Natural> {
    Assigned(Id),
    Natural(Natural),
}

impl<Id: fmt::Display, Natural: fmt::Display> fmt::Display for EntityKey<Id, Natural> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityKey::Assigned(id) => write!(f, "{id}"),
            EntityKey::Natural(natural) => write!(f, "'{natural}'"),
        }
    }
}

/// A participant's natural key: the phone number when known, otherwise the name.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum NaturalKey {
    Phone(String),
    Name(String),
}

impl NaturalKey {
    pub fn for_participant(name: &str, phone: Option<&str>) -> Self {
        match phone.map(str::trim) {
            Some(phone) if !phone.is_empty() => NaturalKey::Phone(phone.to_owned()),
            _ => NaturalKey::Name(name.to_owned()),
        }
    }
}

impl fmt::Display for NaturalKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NaturalKey::Phone(phone) => f.write_str(phone),
            NaturalKey::Name(name) => f.write_str(name),
        }
    }
}

pub type CategoryKey = EntityKey<CategoryId, String>;
pub type ParticipantKey = EntityKey<ParticipantId, NaturalKey>;

impl CategoryKey {
    pub fn name(name: impl Into<String>) -> Self {
        EntityKey::Natural(name.into())
    }
}

impl ParticipantKey {
    pub fn name(name: impl Into<String>) -> Self {
        EntityKey::Natural(NaturalKey::Name(name.into()))
    }

    pub fn phone(phone: impl Into<String>) -> Self {
        EntityKey::Natural(NaturalKey::Phone(phone.into()))
    }
}

/// Two-phase identity shared by every entity stored in a [`crate::LookupTable`].
pub trait Identified {
    type Id: Copy + Eq + Hash + fmt::Debug;
    type Natural: Clone + Eq + Hash + fmt::Debug;

    fn id(&self) -> Option<Self::Id>;

    fn natural_key(&self) -> Self::Natural;

    fn key(&self) -> EntityKey<Self::Id, Self::Natural> {
        match self.id() {
            Some(id) => EntityKey::Assigned(id),
            None => EntityKey::Natural(self.natural_key()),
        }
    }

    /// Every key under which this entity can currently be found.
    fn lookup_keys(&self) -> Vec<EntityKey<Self::Id, Self::Natural>> {
        let mut keys = Vec::with_capacity(2);
        if let Some(id) = self.id() {
            keys.push(EntityKey::Assigned(id));
        }
        keys.push(EntityKey::Natural(self.natural_key()));
        keys
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Category {
    id: Option<CategoryId>,
    name: String,
}

impl Category {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
        }
    }

    pub fn with_id(mut self, id: CategoryId) -> Self {
        self.id = Some(id);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn set_name(&mut self, name: String) {
        self.name = name;
    }

    pub(crate) fn set_id(&mut self, id: CategoryId) {
        self.id = Some(id);
    }
}

impl Identified for Category {
    type Id = CategoryId;
    type Natural = String;

    fn id(&self) -> Option<CategoryId> {
        self.id
    }

    fn natural_key(&self) -> String {
        self.name.clone()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Participant {
    id: Option<ParticipantId>,
    name: String,
    phone: Option<String>,
    email: Option<String>,
    expenses: IndexMap<CategoryKey, Money>,
    consumed: IndexSet<CategoryKey>,
    balance: Money,
    total_consumed: Money,
}

impl Participant {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            phone: None,
            email: None,
            expenses: IndexMap::new(),
            consumed: IndexSet::new(),
            balance: Money::ZERO,
            total_consumed: Money::ZERO,
        }
    }

    pub fn with_phone(mut self, phone: impl Into<String>) -> Self {
        let phone = phone.into();
        self.phone = (!phone.trim().is_empty()).then_some(phone);
        self
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        let email = email.into();
        self.email = (!email.trim().is_empty()).then_some(email);
        self
    }

    pub fn with_id(mut self, id: ParticipantId) -> Self {
        self.id = Some(id);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn phone(&self) -> Option<&str> {
        self.phone.as_deref()
    }

    pub fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }

    pub fn expenses(&self) -> &IndexMap<CategoryKey, Money> {
        &self.expenses
    }

    pub fn consumed_categories(&self) -> &IndexSet<CategoryKey> {
        &self.consumed
    }

    pub fn consumes(&self, category: &CategoryKey) -> bool {
        self.consumed.contains(category)
    }

    /// Sum of everything this participant paid for, saturating at the decimal
    /// bounds. Settlement passes use the checked sum instead.
    pub fn total_expense(&self) -> Money {
        self.expenses
            .values()
            .fold(Money::ZERO, |total, &amount| {
                Money(total.0.saturating_add(amount.0))
            })
    }

    /// Net balance from the last settlement pass.
    pub fn balance(&self) -> Money {
        self.balance
    }

    /// Fee-adjusted consumption from the last settlement pass.
    pub fn total_consumed(&self) -> Money {
        self.total_consumed
    }

    /// Records a payment. Amounts under [`MIN_RECORDED_EXPENSE`] are not recorded;
    /// returns whether the entry was stored.
    pub fn record_expense(&mut self, category: CategoryKey, amount: Money) -> bool {
        if amount < MIN_RECORDED_EXPENSE {
            return false;
        }
        self.expenses.insert(category, amount);
        true
    }

    /// Overwrites a payment; a non-positive amount removes the entry.
    pub fn set_expense(&mut self, category: CategoryKey, amount: Money) {
        if amount <= Money::ZERO {
            self.expenses.shift_remove(&category);
        } else {
            self.expenses.insert(category, amount);
        }
    }

    pub fn add_consumed_category(&mut self, category: CategoryKey) -> bool {
        self.consumed.insert(category)
    }

    pub fn set_consumed_categories<I>(&mut self, categories: I)
    where
        I: IntoIterator<Item = CategoryKey>,
    {
        self.consumed = categories.into_iter().collect();
    }

    pub(crate) fn set_name(&mut self, name: String) {
        self.name = name;
    }

    pub(crate) fn set_id(&mut self, id: ParticipantId) {
        self.id = Some(id);
    }

    pub(crate) fn set_balance(&mut self, balance: Money) {
        self.balance = balance;
    }

    pub(crate) fn set_total_consumed(&mut self, total_consumed: Money) {
        self.total_consumed = total_consumed;
    }

    /// Points every reference in `old` at `new`, keeping expense order.
    pub(crate) fn rekey_category(&mut self, old: &[CategoryKey], new: &CategoryKey) {
        if self.expenses.keys().any(|key| old.contains(key)) {
            let mut merged = Money::ZERO;
            let mut position = None;
            self.expenses = std::mem::take(&mut self.expenses)
                .into_iter()
                .enumerate()
                .filter_map(|(idx, (key, amount))| {
                    if old.contains(&key) || key == *new {
                        merged += amount;
                        position.get_or_insert(idx);
                        None
                    } else {
                        Some((key, amount))
                    }
                })
                .collect();
            let index = position.unwrap_or(self.expenses.len()).min(self.expenses.len());
            self.expenses.shift_insert(index, new.clone(), merged);
        }

        if self.consumed.iter().any(|key| old.contains(key)) {
            self.consumed = std::mem::take(&mut self.consumed)
                .into_iter()
                .map(|key| if old.contains(&key) { new.clone() } else { key })
                .collect();
        }
    }

    pub(crate) fn references_any(&self, keys: &[CategoryKey]) -> bool {
        self.expenses.keys().chain(self.consumed.iter()).any(|key| keys.contains(key))
    }
}

impl Identified for Participant {
    type Id = ParticipantId;
    type Natural = NaturalKey;

    fn id(&self) -> Option<ParticipantId> {
        self.id
    }

    fn natural_key(&self) -> NaturalKey {
        NaturalKey::for_participant(&self.name, self.phone.as_deref())
    }
}

/// One transfer of the settlement: `debtor` pays `amount` to `creditor`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Debt {
    debtor: ParticipantKey,
    creditor: ParticipantKey,
    amount: Money,
}

impl Debt {
    pub(crate) fn new(debtor: ParticipantKey, creditor: ParticipantKey, amount: Money) -> Self {
        debug_assert!(amount.is_positive());
        debug_assert_ne!(debtor, creditor);
        Self {
            debtor,
            creditor,
            amount,
        }
    }

    pub fn debtor(&self) -> &ParticipantKey {
        &self.debtor
    }

    pub fn creditor(&self) -> &ParticipantKey {
        &self.creditor
    }

    pub fn amount(&self) -> Money {
        self.amount
    }
}

impl fmt::Display for Debt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} owes {} to {}",
            self.debtor, self.amount, self.creditor
        )
    }
}
