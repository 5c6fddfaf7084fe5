// Allow dead_code because these helpers are used across different test files
// which are compiled separately
#![allow(dead_code)]

use anyhow::Result;
use chrono::{DateTime, NaiveDate, Utc};
use moneta::application::LedgerService;
use moneta::domain::{Calendar, DEFAULT_OWNER, Owner, Transaction, TransactionKind};
use tempfile::TempDir;

/// Helper to create a test service with a temporary database
pub async fn test_service() -> Result<(LedgerService, TempDir)> {
    let temp_dir = TempDir::new()?;
    let db_path = temp_dir.path().join("test.db");
    let service = LedgerService::init(db_path.to_str().unwrap()).await?;
    Ok((service, temp_dir))
}

/// Same as [`test_service`] but with day and month boundaries at `offset`.
pub async fn test_service_with_offset(offset: &str) -> Result<(LedgerService, TempDir)> {
    let (service, temp_dir) = test_service().await?;
    let calendar = Calendar::parse(offset)?;
    Ok((service.with_calendar(calendar), temp_dir))
}

/// Helper to parse a date string into DateTime<Utc>
pub fn parse_date(date_str: &str) -> DateTime<Utc> {
    NaiveDate::parse_from_str(date_str, "%Y-%m-%d")
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
        .and_utc()
}

/// Helper to parse an RFC 3339 timestamp
pub fn parse_instant(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
}

/// The owner every fresh database starts with
pub async fn demo_owner(service: &LedgerService) -> Result<Owner> {
    Ok(service.get_owner(DEFAULT_OWNER).await?)
}

/// Record a transaction on a given day
pub async fn add_on(
    service: &LedgerService,
    owner: &Owner,
    kind: TransactionKind,
    amount: &str,
    date: &str,
) -> Result<Transaction> {
    let description = match kind {
        TransactionKind::Income => "Payment",
        TransactionKind::Expense => "Purchase",
    };
    Ok(service
        .create_transaction(
            owner.id,
            kind,
            amount,
            description,
            "general",
            Some(parse_date(date)),
        )
        .await?)
}
