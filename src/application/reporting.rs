use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{BalancePoint, Cents, MonthlyStats, Owner, OwnerId, Transaction};

/// Everything an advice generator needs to know about an owner's finances.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinancialSummary {
    pub owner: Owner,
    pub as_of: DateTime<Utc>,
    pub current_balance: Cents,
    pub monthly: MonthlyStats,
    pub recent_transactions: Vec<Transaction>,
}

/// A balance history together with the window it was computed for.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BalanceHistoryReport {
    pub owner_id: OwnerId,
    pub days: i64,
    pub end: DateTime<Utc>,
    pub points: Vec<BalancePoint>,
}
