use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io::Write;

use crate::application::{BalanceHistoryReport, LedgerService};
use crate::domain::{Owner, OwnerId, Transaction, format_cents};

/// All transactions of one owner, as written by a JSON export.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    pub version: String,
    pub exported_at: DateTime<Utc>,
    pub owner: Owner,
    pub transactions: Vec<Transaction>,
}

/// Exporter for converting ledger data to CSV or JSON.
pub struct Exporter<'a> {
    service: &'a LedgerService,
}

impl<'a> Exporter<'a> {
    pub fn new(service: &'a LedgerService) -> Self {
        Self { service }
    }

    /// Export an owner's transactions to CSV, oldest first.
    /// The columns match what [`crate::io::Importer`] reads back.
    pub async fn export_transactions_csv<W: Write>(
        &self,
        owner_id: OwnerId,
        writer: W,
    ) -> Result<usize> {
        let transactions = self.service.list_transactions(owner_id, None).await?;
        let mut csv_writer = csv::Writer::from_writer(writer);

        csv_writer.write_record(["id", "date", "kind", "amount", "description", "category"])?;

        let mut count = 0;
        for transaction in transactions.iter().rev() {
            csv_writer.write_record(&[
                transaction.id.to_string(),
                transaction.date.to_rfc3339(),
                transaction.kind.as_str().to_string(),
                format_cents(transaction.amount_cents),
                transaction.description.clone(),
                transaction.category.clone(),
            ])?;
            count += 1;
        }

        csv_writer.flush()?;
        Ok(count)
    }

    /// Export an owner's transactions as a pretty-printed JSON snapshot.
    pub async fn export_transactions_json<W: Write>(
        &self,
        owner_id: OwnerId,
        mut writer: W,
    ) -> Result<LedgerSnapshot> {
        let owner = self.service.get_owner_by_id(owner_id).await?;
        let mut transactions = self.service.list_transactions(owner_id, None).await?;
        transactions.reverse();

        let snapshot = LedgerSnapshot {
            version: env!("CARGO_PKG_VERSION").to_string(),
            exported_at: Utc::now(),
            owner,
            transactions,
        };

        let json = serde_json::to_string_pretty(&snapshot)?;
        writer.write_all(json.as_bytes())?;
        writer.flush()?;

        Ok(snapshot)
    }

    /// Export a balance history to CSV with one `date,balance` row per day.
    pub async fn export_history_csv<W: Write>(
        &self,
        owner_id: OwnerId,
        days: i64,
        end: DateTime<Utc>,
        writer: W,
    ) -> Result<usize> {
        let points = self
            .service
            .balance_history_until(owner_id, days, end)
            .await?;
        let mut csv_writer = csv::Writer::from_writer(writer);

        csv_writer.write_record(["date", "balance"])?;
        for point in &points {
            csv_writer.write_record(&[
                point.date.format("%Y-%m-%d").to_string(),
                format_cents(point.balance),
            ])?;
        }

        csv_writer.flush()?;
        Ok(points.len())
    }

    /// Export a balance history as JSON.
    pub async fn export_history_json<W: Write>(
        &self,
        owner_id: OwnerId,
        days: i64,
        end: DateTime<Utc>,
        mut writer: W,
    ) -> Result<BalanceHistoryReport> {
        let report = self
            .service
            .balance_history_report(owner_id, days, end)
            .await?;

        let json = serde_json::to_string_pretty(&report)?;
        writer.write_all(json.as_bytes())?;
        writer.flush()?;

        Ok(report)
    }
}
