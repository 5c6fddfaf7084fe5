use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::{Cents, OwnerId, ParseCentsError, parse_cents};

pub type TransactionId = i64;

/// Largest amount a single transaction may carry: 10,000,000,000.00.
/// Keeps all-time sums over millions of rows inside `i64`.
pub const MAX_AMOUNT_CENTS: Cents = 1_000_000_000_000;

/// Whether a transaction adds money to the owner's balance or takes it away.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    Income,
    Expense,
}

impl TransactionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionKind::Income => "income",
            TransactionKind::Expense => "expense",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "income" => Some(TransactionKind::Income),
            "expense" => Some(TransactionKind::Expense),
            _ => None,
        }
    }

    /// Apply the kind's sign to a (positive) amount.
    pub fn signed(&self, amount_cents: Cents) -> Cents {
        match self {
            TransactionKind::Income => amount_cents,
            TransactionKind::Expense => -amount_cents,
        }
    }
}

impl std::fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for TransactionKind {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TransactionKind::from_str(s).ok_or_else(|| ValidationError::InvalidKind(s.to_string()))
    }
}

/// Reasons a transaction (or owner) is rejected before it reaches storage.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Invalid amount '{input}': {reason}")]
    InvalidAmount {
        input: String,
        reason: ParseCentsError,
    },

    #[error("Amount must be a positive number")]
    NonPositiveAmount(Cents),

    #[error("Amount must not exceed 10000000000.00")]
    AmountTooLarge(Cents),

    #[error("Description is required")]
    EmptyDescription,

    #[error("Category is required")]
    EmptyCategory,

    #[error("Invalid transaction kind '{0}', expected income or expense")]
    InvalidKind(String),

    #[error("Username is required")]
    EmptyUsername,
}

impl ValidationError {
    /// Name of the input field the error is about, if there is one.
    pub fn field(&self) -> Option<&'static str> {
        match self {
            ValidationError::InvalidAmount { .. }
            | ValidationError::NonPositiveAmount(_)
            | ValidationError::AmountTooLarge(_) => Some("amount"),
            ValidationError::EmptyDescription => Some("description"),
            ValidationError::EmptyCategory => Some("category"),
            ValidationError::InvalidKind(_) => Some("kind"),
            ValidationError::EmptyUsername => Some("username"),
        }
    }
}

/// A recorded income or expense. Immutable once stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: TransactionId,
    pub owner_id: OwnerId,
    pub kind: TransactionKind,
    /// Always positive; the sign comes from `kind`
    pub amount_cents: Cents,
    pub description: String,
    pub category: String,
    /// When the income/expense happened
    pub date: DateTime<Utc>,
    /// When the row was written
    pub recorded_at: DateTime<Utc>,
}

impl Transaction {
    /// Contribution of this transaction to the running balance.
    pub fn signed_amount(&self) -> Cents {
        self.kind.signed(self.amount_cents)
    }

    pub fn is_income(&self) -> bool {
        self.kind == TransactionKind::Income
    }
}

/// A validated transaction that has not been stored yet.
///
/// The only way to build one is through [`NewTransaction::new`] or
/// [`NewTransaction::parse`], so a draft that exists is always insertable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTransaction {
    kind: TransactionKind,
    amount_cents: Cents,
    description: String,
    category: String,
    date: Option<DateTime<Utc>>,
}

impl NewTransaction {
    pub fn new(
        kind: TransactionKind,
        amount_cents: Cents,
        description: impl Into<String>,
        category: impl Into<String>,
    ) -> Result<Self, ValidationError> {
        if amount_cents <= 0 {
            return Err(ValidationError::NonPositiveAmount(amount_cents));
        }
        if amount_cents > MAX_AMOUNT_CENTS {
            return Err(ValidationError::AmountTooLarge(amount_cents));
        }

        let description = description.into().trim().to_string();
        if description.is_empty() {
            return Err(ValidationError::EmptyDescription);
        }

        let category = category.into().trim().to_string();
        if category.is_empty() {
            return Err(ValidationError::EmptyCategory);
        }

        Ok(Self {
            kind,
            amount_cents,
            description,
            category,
            date: None,
        })
    }

    /// Validate raw user input (kind and amount as text).
    pub fn parse(
        kind: &str,
        amount: &str,
        description: &str,
        category: &str,
    ) -> Result<Self, ValidationError> {
        let kind: TransactionKind = kind.parse()?;
        let amount_cents = parse_cents(amount).map_err(|reason| ValidationError::InvalidAmount {
            input: amount.to_string(),
            reason,
        })?;
        Self::new(kind, amount_cents, description, category)
    }

    /// Set the effective date. Without one the insert time is used.
    pub fn with_date(mut self, date: DateTime<Utc>) -> Self {
        self.date = Some(date);
        self
    }

    pub fn kind(&self) -> TransactionKind {
        self.kind
    }

    pub fn amount_cents(&self) -> Cents {
        self.amount_cents
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn date(&self) -> Option<DateTime<Utc>> {
        self.date
    }
}
