use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::{Row, SqlitePool};

use crate::domain::{Cents, NewTransaction, Owner, OwnerId, Transaction, TransactionKind};

use super::MIGRATION_001_INITIAL;

const TRANSACTION_COLUMNS: &str =
    "id, owner_id, kind, amount_cents, description, category, date, recorded_at";

/// Repository for persisting and querying owners and their transactions.
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    /// Create a new repository with the given SQLite connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Connect to a SQLite database at the given URL.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = SqlitePool::connect(database_url)
            .await
            .context("Failed to connect to database")?;
        Ok(Self::new(pool))
    }

    /// Run database migrations. Safe to run more than once.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::query(MIGRATION_001_INITIAL)
            .execute(&self.pool)
            .await
            .context("Failed to run migration 001")?;

        tracing::debug!("database schema is up to date");
        Ok(())
    }

    /// Initialize a new database (connect + migrate).
    pub async fn init(database_url: &str) -> Result<Self> {
        let repo = Self::connect(database_url).await?;
        repo.migrate().await?;
        Ok(repo)
    }

    // ========================
    // Owner operations
    // ========================

    /// Insert a new owner and return it with its assigned ID.
    pub async fn save_owner(&self, username: &str) -> Result<Owner> {
        let row = sqlx::query(
            r#"
            INSERT INTO owners (username, created_at)
            VALUES (?, ?)
            RETURNING id, username, created_at
            "#,
        )
        .bind(username)
        .bind(encode_timestamp(Utc::now()))
        .fetch_one(&self.pool)
        .await
        .context("Failed to save owner")?;

        Self::row_to_owner(&row)
    }

    /// Get an owner by ID.
    pub async fn get_owner(&self, id: OwnerId) -> Result<Option<Owner>> {
        let row = sqlx::query("SELECT id, username, created_at FROM owners WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch owner")?;

        row.as_ref().map(Self::row_to_owner).transpose()
    }

    /// Get an owner by username.
    pub async fn get_owner_by_username(&self, username: &str) -> Result<Option<Owner>> {
        let row = sqlx::query("SELECT id, username, created_at FROM owners WHERE username = ?")
            .bind(username)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch owner by username")?;

        row.as_ref().map(Self::row_to_owner).transpose()
    }

    /// List all owners, oldest first.
    pub async fn list_owners(&self) -> Result<Vec<Owner>> {
        let rows = sqlx::query("SELECT id, username, created_at FROM owners ORDER BY id")
            .fetch_all(&self.pool)
            .await
            .context("Failed to list owners")?;

        rows.iter().map(Self::row_to_owner).collect()
    }

    fn row_to_owner(row: &sqlx::sqlite::SqliteRow) -> Result<Owner> {
        let created_at_str: String = row.get("created_at");

        Ok(Owner {
            id: row.get("id"),
            username: row.get("username"),
            created_at: decode_timestamp(&created_at_str).context("Invalid created_at")?,
        })
    }

    // ========================
    // Transaction operations
    // ========================

    /// Append a validated transaction for an owner.
    /// The ID is assigned by the database; a missing date falls back to `recorded_at`.
    pub async fn insert_transaction(
        &self,
        owner_id: OwnerId,
        draft: &NewTransaction,
        recorded_at: DateTime<Utc>,
    ) -> Result<Transaction> {
        let date = draft.date().unwrap_or(recorded_at);

        let query = format!(
            r#"
            INSERT INTO transactions (owner_id, kind, amount_cents, description, category, date, recorded_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            RETURNING {}
            "#,
            TRANSACTION_COLUMNS
        );

        let row = sqlx::query(&query)
            .bind(owner_id)
            .bind(draft.kind().as_str())
            .bind(draft.amount_cents())
            .bind(draft.description())
            .bind(draft.category())
            .bind(encode_timestamp(date))
            .bind(encode_timestamp(recorded_at))
            .fetch_one(&self.pool)
            .await
            .context("Failed to save transaction")?;

        Self::row_to_transaction(&row)
    }

    /// List an owner's transactions, most recent effective date first.
    pub async fn list_transactions(
        &self,
        owner_id: OwnerId,
        limit: Option<usize>,
    ) -> Result<Vec<Transaction>> {
        let mut query = format!(
            "SELECT {} FROM transactions WHERE owner_id = ? ORDER BY date DESC, id DESC",
            TRANSACTION_COLUMNS
        );

        // SQLite limits are signed; anything larger means "no limit"
        let limit = limit.map(|lim| i64::try_from(lim).unwrap_or(i64::MAX));
        if limit.is_some() {
            query.push_str(" LIMIT ?");
        }

        let mut sql_query = sqlx::query(&query).bind(owner_id);
        if let Some(lim) = limit {
            sql_query = sql_query.bind(lim);
        }

        let rows = sql_query
            .fetch_all(&self.pool)
            .await
            .context("Failed to list transactions")?;

        rows.iter().map(Self::row_to_transaction).collect()
    }

    /// List an owner's transactions with effective dates inside the given
    /// (inclusive) bounds, oldest first.
    pub async fn list_transactions_between(
        &self,
        owner_id: OwnerId,
        from_date: Option<DateTime<Utc>>,
        to_date: Option<DateTime<Utc>>,
    ) -> Result<Vec<Transaction>> {
        let mut query = format!(
            "SELECT {} FROM transactions WHERE owner_id = ?",
            TRANSACTION_COLUMNS
        );

        let from_date_str = from_date.map(encode_timestamp);
        let to_date_str = to_date.map(encode_timestamp);

        if from_date_str.is_some() {
            query.push_str(" AND date >= ?");
        }
        if to_date_str.is_some() {
            query.push_str(" AND date <= ?");
        }
        query.push_str(" ORDER BY date, id");

        let mut sql_query = sqlx::query(&query).bind(owner_id);
        if let Some(ref fd_str) = from_date_str {
            sql_query = sql_query.bind(fd_str);
        }
        if let Some(ref td_str) = to_date_str {
            sql_query = sql_query.bind(td_str);
        }

        let rows = sql_query
            .fetch_all(&self.pool)
            .await
            .context("Failed to list transactions in range")?;

        rows.iter().map(Self::row_to_transaction).collect()
    }

    /// Compute an owner's all-time balance using SQL aggregation.
    pub async fn compute_balance(&self, owner_id: OwnerId) -> Result<Cents> {
        let row = sqlx::query(
            r#"
            SELECT
                COALESCE(SUM(CASE WHEN kind = 'income' THEN amount_cents ELSE 0 END), 0) -
                COALESCE(SUM(CASE WHEN kind = 'expense' THEN amount_cents ELSE 0 END), 0) as balance
            FROM transactions
            WHERE owner_id = ?
            "#,
        )
        .bind(owner_id)
        .fetch_one(&self.pool)
        .await
        .context("Failed to compute balance")?;

        Ok(row.get("balance"))
    }

    fn row_to_transaction(row: &sqlx::sqlite::SqliteRow) -> Result<Transaction> {
        let kind_str: String = row.get("kind");
        let date_str: String = row.get("date");
        let recorded_at_str: String = row.get("recorded_at");

        Ok(Transaction {
            id: row.get("id"),
            owner_id: row.get("owner_id"),
            kind: TransactionKind::from_str(&kind_str)
                .ok_or_else(|| anyhow::anyhow!("Invalid transaction kind: {}", kind_str))?,
            amount_cents: row.get("amount_cents"),
            description: row.get("description"),
            category: row.get("category"),
            date: decode_timestamp(&date_str).context("Invalid transaction date")?,
            recorded_at: decode_timestamp(&recorded_at_str).context("Invalid recorded_at")?,
        })
    }
}

/// Fixed-width UTC form, so that comparing the stored text compares the instants.
fn encode_timestamp(timestamp: DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn decode_timestamp(value: &str) -> Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(value)?.with_timezone(&Utc))
}
