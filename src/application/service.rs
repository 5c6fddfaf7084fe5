use chrono::{DateTime, Days, Utc};

use crate::domain::{
    BalancePoint, Calendar, Cents, MonthlyStats, NewTransaction, Owner, OwnerId, Transaction,
    TransactionKind, ValidationError, balance_history, compute_balance, monthly_stats,
    normalize_username, parse_cents,
};
use crate::storage::Repository;

use super::{AppError, BalanceHistoryReport, FinancialSummary};

/// Number of days covered by a balance history when the caller does not say.
pub const DEFAULT_HISTORY_DAYS: i64 = 30;

/// Number of recent transactions included in a financial summary by default.
pub const DEFAULT_RECENT_LIMIT: usize = 10;

/// Application service providing high-level operations for the ledger.
/// This is the primary interface for any client (CLI, API, advice generator, etc.).
pub struct LedgerService {
    repo: Repository,
    calendar: Calendar,
}

impl LedgerService {
    /// Create a new ledger service with the given repository and calendar.
    pub fn new(repo: Repository, calendar: Calendar) -> Self {
        Self { repo, calendar }
    }

    /// Initialize a database at the given path, creating it if needed.
    pub async fn init(database_path: &str) -> Result<Self, AppError> {
        let db_url = format!("sqlite:{}?mode=rwc", database_path);
        let repo = Repository::init(&db_url).await?;
        tracing::info!(database = database_path, "database initialized");
        Ok(Self::new(repo, Calendar::utc()))
    }

    /// Connect to an existing database.
    pub async fn connect(database_path: &str) -> Result<Self, AppError> {
        let db_url = format!("sqlite:{}", database_path);
        let repo = Repository::connect(&db_url).await?;
        Ok(Self::new(repo, Calendar::utc()))
    }

    /// Use a different calendar for day and month boundaries.
    pub fn with_calendar(mut self, calendar: Calendar) -> Self {
        self.calendar = calendar;
        self
    }

    pub fn calendar(&self) -> &Calendar {
        &self.calendar
    }

    // ========================
    // Owner operations
    // ========================

    /// Register a new owner.
    pub async fn register_owner(&self, username: &str) -> Result<Owner, AppError> {
        let username = normalize_username(username)?;

        if self.repo.get_owner_by_username(&username).await?.is_some() {
            return Err(AppError::OwnerAlreadyExists(username));
        }

        let owner = self.repo.save_owner(&username).await?;
        tracing::info!(owner_id = owner.id, username = %owner.username, "registered owner");
        Ok(owner)
    }

    /// Get an owner by username.
    pub async fn get_owner(&self, username: &str) -> Result<Owner, AppError> {
        let username = username.trim();
        self.repo
            .get_owner_by_username(username)
            .await?
            .ok_or_else(|| AppError::OwnerNotFound(username.to_string()))
    }

    /// Get an owner by ID.
    pub async fn get_owner_by_id(&self, id: OwnerId) -> Result<Owner, AppError> {
        self.repo
            .get_owner(id)
            .await?
            .ok_or_else(|| AppError::OwnerNotFound(id.to_string()))
    }

    /// List all owners.
    pub async fn list_owners(&self) -> Result<Vec<Owner>, AppError> {
        Ok(self.repo.list_owners().await?)
    }

    // ========================
    // Transaction operations
    // ========================

    /// Validate and record a transaction from raw input.
    /// Without a `date` the transaction takes effect now.
    pub async fn create_transaction(
        &self,
        owner_id: OwnerId,
        kind: TransactionKind,
        amount: &str,
        description: &str,
        category: &str,
        date: Option<DateTime<Utc>>,
    ) -> Result<Transaction, AppError> {
        let draft = parse_cents(amount)
            .map_err(|reason| ValidationError::InvalidAmount {
                input: amount.to_string(),
                reason,
            })
            .and_then(|amount_cents| {
                NewTransaction::new(kind, amount_cents, description, category)
            });

        let mut draft = match draft {
            Ok(draft) => draft,
            Err(e) => {
                tracing::warn!(owner_id, error = %e, "rejected transaction");
                return Err(e.into());
            }
        };

        if let Some(date) = date {
            draft = draft.with_date(date);
        }

        self.record_transaction(owner_id, draft).await
    }

    /// Record an already validated transaction.
    pub async fn record_transaction(
        &self,
        owner_id: OwnerId,
        draft: NewTransaction,
    ) -> Result<Transaction, AppError> {
        // Reads treat unknown owners as empty; writes must not invent them
        self.get_owner_by_id(owner_id).await?;

        let transaction = self
            .repo
            .insert_transaction(owner_id, &draft, Utc::now())
            .await?;

        tracing::info!(
            owner_id,
            transaction_id = transaction.id,
            kind = %transaction.kind,
            amount_cents = transaction.amount_cents,
            "recorded transaction"
        );
        Ok(transaction)
    }

    /// List an owner's transactions, most recent first.
    pub async fn list_transactions(
        &self,
        owner_id: OwnerId,
        limit: Option<usize>,
    ) -> Result<Vec<Transaction>, AppError> {
        Ok(self.repo.list_transactions(owner_id, limit).await?)
    }

    // ========================
    // Aggregates
    // ========================

    /// All-time balance of an owner. Zero when there is nothing recorded.
    pub async fn current_balance(&self, owner_id: OwnerId) -> Result<Cents, AppError> {
        let balance = self.repo.compute_balance(owner_id).await?;
        tracing::debug!(owner_id, balance, "computed current balance");
        Ok(balance)
    }

    /// Income, expenses and transaction count for the current month so far.
    pub async fn monthly_stats(&self, owner_id: OwnerId) -> Result<MonthlyStats, AppError> {
        self.monthly_stats_at(owner_id, Utc::now()).await
    }

    /// Income, expenses and transaction count from the start of `reference`'s
    /// month up to `reference`.
    pub async fn monthly_stats_at(
        &self,
        owner_id: OwnerId,
        reference: DateTime<Utc>,
    ) -> Result<MonthlyStats, AppError> {
        let month_start = self.calendar.start_of_month(reference);
        let transactions = self
            .repo
            .list_transactions_between(owner_id, Some(month_start), Some(reference))
            .await?;

        let stats = monthly_stats(&transactions, reference, &self.calendar);
        tracing::debug!(owner_id, count = stats.count, "computed monthly stats");
        Ok(stats)
    }

    /// Daily balances over the last `days` days, ending today.
    pub async fn balance_history(
        &self,
        owner_id: OwnerId,
        days: i64,
    ) -> Result<Vec<BalancePoint>, AppError> {
        self.balance_history_until(owner_id, days, Utc::now()).await
    }

    /// Daily balances from `days` days before `end` through the day of `end`.
    pub async fn balance_history_until(
        &self,
        owner_id: OwnerId,
        days: i64,
        end: DateTime<Utc>,
    ) -> Result<Vec<BalancePoint>, AppError> {
        // One read covers both the seed and the window
        let next_day = self
            .calendar
            .date_of(end)
            .checked_add_days(Days::new(1))
            .map(|day| self.calendar.start_of_day(day));
        let transactions = self
            .repo
            .list_transactions_between(owner_id, None, next_day)
            .await?;

        let history = balance_history(&transactions, days, end, &self.calendar);
        tracing::debug!(owner_id, days, points = history.len(), "computed balance history");
        Ok(history)
    }

    /// Balance history wrapped with the window it describes.
    pub async fn balance_history_report(
        &self,
        owner_id: OwnerId,
        days: i64,
        end: DateTime<Utc>,
    ) -> Result<BalanceHistoryReport, AppError> {
        let points = self.balance_history_until(owner_id, days, end).await?;
        Ok(BalanceHistoryReport {
            owner_id,
            days,
            end,
            points,
        })
    }

    /// Balance, month-to-date stats and the most recent transactions,
    /// all computed from the same read.
    pub async fn financial_summary(
        &self,
        owner_id: OwnerId,
        recent_limit: usize,
    ) -> Result<FinancialSummary, AppError> {
        let owner = self.get_owner_by_id(owner_id).await?;
        let as_of = Utc::now();

        let mut transactions = self.repo.list_transactions(owner_id, None).await?;

        let current_balance = compute_balance(&transactions);
        let monthly = monthly_stats(&transactions, as_of, &self.calendar);
        transactions.truncate(recent_limit);

        Ok(FinancialSummary {
            owner,
            as_of,
            current_balance,
            monthly,
            recent_transactions: transactions,
        })
    }
}
