use anyhow::Result;
use serde::Deserialize;
use std::io::Read;

use crate::application::LedgerService;
use crate::domain::{NewTransaction, OwnerId};

/// Result of an import operation
#[derive(Debug, Clone, Default)]
pub struct ImportResult {
    pub imported: usize,
    pub errors: Vec<ImportError>,
}

/// A row that could not be imported
#[derive(Debug, Clone)]
pub struct ImportError {
    pub line: usize,
    pub field: Option<String>,
    pub error: String,
}

/// Options for import operations
#[derive(Debug, Clone, Default)]
pub struct ImportOptions {
    /// Validate every row but write nothing
    pub dry_run: bool,
}

/// One CSV row. Extra columns (such as `id` from an export) are ignored.
#[derive(Debug, Deserialize)]
struct TransactionRow {
    #[serde(default)]
    date: Option<String>,
    kind: String,
    amount: String,
    description: String,
    category: String,
}

/// Importer for loading transactions into the ledger
pub struct Importer<'a> {
    service: &'a LedgerService,
}

impl<'a> Importer<'a> {
    pub fn new(service: &'a LedgerService) -> Self {
        Self { service }
    }

    /// Import transactions from CSV with a `date,kind,amount,description,category` header.
    ///
    /// Rows go through the same validation as any other insert. Invalid rows
    /// are collected with their line number and the rest still get imported;
    /// storage failures abort the import.
    pub async fn import_transactions_csv<R: Read>(
        &self,
        owner_id: OwnerId,
        reader: R,
        options: ImportOptions,
    ) -> Result<ImportResult> {
        // Fail early on an unknown owner, also for dry runs
        self.service.get_owner_by_id(owner_id).await?;

        let calendar = *self.service.calendar();
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);
        let mut result = ImportResult::default();

        for (line_num, row) in csv_reader.deserialize::<TransactionRow>().enumerate() {
            let line = line_num + 2; // +2 for header and 0-indexing

            let row = match row {
                Ok(row) => row,
                Err(e) => {
                    result.errors.push(ImportError {
                        line,
                        field: None,
                        error: format!("CSV parse error: {}", e),
                    });
                    continue;
                }
            };

            let mut draft =
                match NewTransaction::parse(&row.kind, &row.amount, &row.description, &row.category)
                {
                    Ok(draft) => draft,
                    Err(e) => {
                        result.errors.push(ImportError {
                            line,
                            field: e.field().map(str::to_string),
                            error: e.to_string(),
                        });
                        continue;
                    }
                };

            if let Some(date_str) = row.date.as_deref().filter(|s| !s.is_empty()) {
                match calendar.parse_instant(date_str) {
                    Some(date) => draft = draft.with_date(date),
                    None => {
                        result.errors.push(ImportError {
                            line,
                            field: Some("date".to_string()),
                            error: format!("Invalid date '{}'", date_str),
                        });
                        continue;
                    }
                }
            }

            if !options.dry_run {
                self.service.record_transaction(owner_id, draft).await?;
            }
            result.imported += 1;
        }

        if !result.errors.is_empty() {
            tracing::warn!(
                owner_id,
                rejected = result.errors.len(),
                "some rows were not imported"
            );
        }
        tracing::info!(
            owner_id,
            imported = result.imported,
            dry_run = options.dry_run,
            "import finished"
        );

        Ok(result)
    }
}
