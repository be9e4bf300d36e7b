use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// A server-confirmed transaction as returned by `GET /transactions/`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: String,
    /// Free-text description (the wire field is `text`)
    #[serde(rename = "text")]
    pub description: String,
    /// Signed amount (positive for income, negative for expense)
    #[serde(deserialize_with = "de::amount")]
    pub amount: f64,
    /// Server-assigned creation timestamp (ISO 8601)
    pub created_at: String,
}

impl Transaction {
    /// The sign of the amount is the only income/expense classifier
    pub fn kind(&self) -> TransactionKind {
        TransactionKind::classify(self.amount)
    }

    pub fn is_income(&self) -> bool {
        self.kind() == TransactionKind::Income
    }

    pub fn is_expense(&self) -> bool {
        self.amount < 0.0
    }
}

/// Direction chosen by the user when entering a transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    Income,
    Expense,
}

impl TransactionKind {
    /// Zero is not income: it falls on the expense side of the strict `> 0` test
    pub fn classify(amount: f64) -> Self {
        if amount > 0.0 {
            TransactionKind::Income
        } else {
            TransactionKind::Expense
        }
    }

    /// Apply the direction to a magnitude, ignoring whatever sign the user typed
    pub fn signed(&self, magnitude: f64) -> f64 {
        match self {
            TransactionKind::Income => magnitude.abs(),
            TransactionKind::Expense => -magnitude.abs(),
        }
    }
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransactionKind::Income => write!(f, "income"),
            TransactionKind::Expense => write!(f, "expense"),
        }
    }
}

/// Body of `POST /transactions/` and `PUT /transactions/{id}/`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionFields {
    pub text: String,
    pub amount: f64,
}

/// A monthly plan row as stored by the server (`GET /monthly-plan/`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanItemRecord {
    #[serde(deserialize_with = "de::identifier")]
    pub id: String,
    pub category: String,
    #[serde(deserialize_with = "de::amount")]
    pub amount: f64,
}

/// Body of `POST /monthly-plan/` and `PUT /monthly-plan/{id}/`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanItemFields {
    pub category: String,
    pub amount: f64,
}

/// Input validation failures, caught before any network call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, thiserror::Error)]
pub enum ValidationError {
    #[error("Description cannot be empty")]
    EmptyDescription,
    #[error("Amount must be a finite number, got {0}")]
    InvalidAmount(String),
    #[error("No plan row with id {0}")]
    UnknownPlanRow(String),
}

/// Type of transaction amount for styling and display
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum AmountType {
    Positive,
    Negative,
    Zero,
}

impl AmountType {
    pub fn of(amount: f64) -> Self {
        if amount > 0.0 {
            AmountType::Positive
        } else if amount < 0.0 {
            AmountType::Negative
        } else {
            AmountType::Zero
        }
    }
}

/// Represents a formatted transaction for display purposes
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FormattedTransaction {
    pub id: String,
    pub formatted_date: String,
    pub description: String,
    pub formatted_amount: String,
    pub amount_type: AmountType,
    pub raw_amount: f64,
}

/// Planned-vs-actual outcome for the current month
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub enum BudgetStatus {
    WithinPlan { remaining: f64 },
    OverPlan { over: f64 },
}

impl BudgetStatus {
    /// `remaining_or_over` is `total_planned - monthly_real_spend`
    pub fn from_remaining(remaining_or_over: f64) -> Self {
        if remaining_or_over >= 0.0 {
            BudgetStatus::WithinPlan {
                remaining: remaining_or_over,
            }
        } else {
            BudgetStatus::OverPlan {
                over: remaining_or_over.abs(),
            }
        }
    }

    pub fn is_within_plan(&self) -> bool {
        matches!(self, BudgetStatus::WithinPlan { .. })
    }

    pub fn message(&self) -> String {
        match self {
            BudgetStatus::WithinPlan { remaining } => {
                format!("You are within your plan: ${:.2} left", remaining)
            }
            BudgetStatus::OverPlan { over } => {
                format!("You have exceeded your plan by ${:.2}", over)
            }
        }
    }
}

/// Lenient decoders for the remote service, which serializes decimals as strings
/// and may use integer primary keys.
mod de {
    use super::*;

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NumberOrString {
        Number(f64),
        Text(String),
    }

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum IdRepr {
        Int(i64),
        Text(String),
    }

    pub fn amount<'de, D>(deserializer: D) -> Result<f64, D::Error>
    where
        D: Deserializer<'de>,
    {
        match NumberOrString::deserialize(deserializer)? {
            NumberOrString::Number(n) => Ok(n),
            NumberOrString::Text(s) => s
                .trim()
                .parse::<f64>()
                .map_err(|e| serde::de::Error::custom(format!("invalid amount {:?}: {}", s, e))),
        }
    }

    pub fn identifier<'de, D>(deserializer: D) -> Result<String, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match IdRepr::deserialize(deserializer)? {
            IdRepr::Int(n) => n.to_string(),
            IdRepr::Text(s) => s,
        })
    }
}
