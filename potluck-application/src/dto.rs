use chrono::NaiveDate;
use indexmap::IndexMap;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CategoryDto {
    pub name: String,
}

impl CategoryDto {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// A participant as exchanged over the wire; categories are referenced by name.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ParticipantDto {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default)]
    pub consumed_categories: Vec<String>,
    #[serde(default)]
    pub expenses: IndexMap<String, Decimal>,
}

impl ParticipantDto {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_phone(mut self, phone: impl Into<String>) -> Self {
        self.phone = Some(phone.into());
        self
    }

    pub fn consuming<I, S>(mut self, categories: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.consumed_categories
            .extend(categories.into_iter().map(Into::into));
        self
    }

    pub fn paying(mut self, category: impl Into<String>, amount: Decimal) -> Self {
        self.expenses.insert(category.into(), amount);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventDto {
    pub name: String,
    pub date: NaiveDate,
    #[serde(default)]
    pub participation_fee: Decimal,
    #[serde(default)]
    pub categories: Vec<CategoryDto>,
    #[serde(default)]
    pub participants: Vec<ParticipantDto>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventSummaryDto {
    pub id: u64,
    pub name: String,
    pub date: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DebtDto {
    pub from: String,
    pub to: String,
    pub amount: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParticipantResultDto {
    pub name: String,
    pub paid: Decimal,
    pub consumed: Decimal,
    pub balance: Decimal,
}

/// A settled event: its input plus what the last settlement pass derived.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventResultDto {
    pub event: EventDto,
    pub participants: Vec<ParticipantResultDto>,
    pub debts: Vec<DebtDto>,
}
