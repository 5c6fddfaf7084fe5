use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};

use crate::application::{DEFAULT_HISTORY_DAYS, DEFAULT_RECENT_LIMIT, LedgerService};
use crate::config::Config;
use crate::domain::{DEFAULT_OWNER, Owner, TransactionKind, format_cents};

/// Moneta - Personal Income & Expense Tracker
#[derive(Parser)]
#[command(name = "moneta")]
#[command(about = "Record income and expenses, follow your balance and monthly totals")]
#[command(version)]
pub struct Cli {
    /// Database file path
    #[arg(long, env = "MONETA_DATABASE", default_value = "moneta.db", global = true)]
    pub database: String,

    /// Owner whose ledger the command works on
    #[arg(long, env = "MONETA_OWNER", default_value = DEFAULT_OWNER, global = true)]
    pub owner: String,

    /// UTC offset used for day and month boundaries (e.g. "+02:00")
    #[arg(
        long,
        env = "MONETA_UTC_OFFSET",
        default_value = "+00:00",
        global = true,
        allow_hyphen_values = true
    )]
    pub utc_offset: String,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new database
    Init,

    /// Owner management commands
    #[command(subcommand)]
    Owner(OwnerCommands),

    /// Record an income or an expense
    Add {
        /// Kind of transaction: income or expense
        kind: String,

        /// Amount (e.g., "50.00" or "50")
        #[arg(allow_hyphen_values = true)]
        amount: String,

        /// What the money was for
        #[arg(short, long)]
        description: String,

        /// Category (e.g., "groceries", "salary")
        #[arg(short, long)]
        category: String,

        /// Date of the transaction (YYYY-MM-DD or RFC 3339, defaults to now)
        #[arg(long)]
        date: Option<String>,
    },

    /// List recent transactions, newest first
    Transactions {
        /// Maximum number of transactions to show
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Show the current balance
    Balance,

    /// Show this month's income, expenses and transaction count
    Stats {
        /// Reference date (YYYY-MM-DD or RFC 3339, defaults to now)
        #[arg(long)]
        at: Option<String>,

        /// Output format: table, json
        #[arg(long, default_value = "table")]
        format: String,
    },

    /// Show the daily balance over a trailing window
    History {
        /// Number of days before the end date to include
        #[arg(short = 'n', long, default_value_t = DEFAULT_HISTORY_DAYS, allow_hyphen_values = true)]
        days: i64,

        /// Last day of the window (YYYY-MM-DD or RFC 3339, defaults to now)
        #[arg(long)]
        end: Option<String>,

        /// Output format: table, json, csv
        #[arg(long, default_value = "table")]
        format: String,
    },

    /// Print balance, monthly stats and recent transactions as JSON
    Summary {
        /// Number of recent transactions to include
        #[arg(short, long, default_value_t = DEFAULT_RECENT_LIMIT)]
        limit: usize,
    },

    /// Export data to CSV or JSON
    Export {
        /// What to export: transactions, history
        export_type: String,

        /// Output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<String>,

        /// Format: csv, json
        #[arg(short, long, default_value = "csv")]
        format: String,

        /// Days of history to export
        #[arg(short = 'n', long, default_value_t = DEFAULT_HISTORY_DAYS)]
        days: i64,

        /// Last day of exported history (defaults to now)
        #[arg(long)]
        end: Option<String>,
    },

    /// Import transactions from CSV (date,kind,amount,description,category)
    Import {
        /// Input file (stdin if omitted)
        #[arg(short, long)]
        input: Option<String>,

        /// Validate without importing
        #[arg(long)]
        dry_run: bool,
    },
}

#[derive(Subcommand)]
pub enum OwnerCommands {
    /// Register a new owner
    Create {
        /// Username (must be unique)
        username: String,
    },

    /// List all owners
    List,

    /// Show an owner with their balance
    Show {
        /// Username (defaults to --owner)
        username: Option<String>,
    },
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        let config = Config::new(&self.database, &self.owner, &self.utc_offset)?;
        tracing::debug!(
            database = %config.database,
            owner = %config.owner,
            calendar = %config.calendar,
            "configuration loaded"
        );

        match self.command {
            Commands::Init => {
                config.init_service().await?;
                println!("Database initialized: {}", config.database);
            }

            Commands::Owner(owner_cmd) => {
                let service = config.open_service().await?;
                run_owner_command(&service, &config, owner_cmd).await?;
            }

            Commands::Add {
                kind,
                amount,
                description,
                category,
                date,
            } => {
                let service = config.open_service().await?;
                let owner = service.get_owner(&config.owner).await?;
                let kind: TransactionKind = kind.parse()?;
                let date = date
                    .map(|d| parse_date_arg(&service, &d))
                    .transpose()?;

                let transaction = service
                    .create_transaction(owner.id, kind, &amount, &description, &category, date)
                    .await?;

                println!(
                    "Recorded {}: {} {} ({}) #{}",
                    transaction.kind,
                    format_cents(transaction.amount_cents),
                    transaction.description,
                    transaction.category,
                    transaction.id
                );
            }

            Commands::Transactions { limit } => {
                let service = config.open_service().await?;
                let owner = service.get_owner(&config.owner).await?;
                run_transactions_command(&service, &owner, limit).await?;
            }

            Commands::Balance => {
                let service = config.open_service().await?;
                let owner = service.get_owner(&config.owner).await?;
                let balance = service.current_balance(owner.id).await?;
                println!("{}: {}", owner.username, format_cents(balance));
            }

            Commands::Stats { at, format } => {
                let service = config.open_service().await?;
                let owner = service.get_owner(&config.owner).await?;
                let reference = match at {
                    Some(d) => parse_date_arg(&service, &d)?,
                    None => Utc::now(),
                };
                run_stats_command(&service, &owner, reference, &format).await?;
            }

            Commands::History { days, end, format } => {
                let service = config.open_service().await?;
                let owner = service.get_owner(&config.owner).await?;
                let end = match end {
                    Some(d) => parse_date_arg(&service, &d)?,
                    None => Utc::now(),
                };
                run_history_command(&service, &owner, days, end, &format).await?;
            }

            Commands::Summary { limit } => {
                let service = config.open_service().await?;
                let owner = service.get_owner(&config.owner).await?;
                let summary = service.financial_summary(owner.id, limit).await?;
                println!("{}", serde_json::to_string_pretty(&summary)?);
            }

            Commands::Export {
                export_type,
                output,
                format,
                days,
                end,
            } => {
                let service = config.open_service().await?;
                let owner = service.get_owner(&config.owner).await?;
                let end = match end {
                    Some(d) => parse_date_arg(&service, &d)?,
                    None => Utc::now(),
                };
                run_export_command(
                    &service,
                    &owner,
                    &export_type,
                    output.as_deref(),
                    &format,
                    days,
                    end,
                )
                .await?;
            }

            Commands::Import { input, dry_run } => {
                let service = config.open_service().await?;
                let owner = service.get_owner(&config.owner).await?;
                run_import_command(&service, &owner, input.as_deref(), dry_run).await?;
            }
        }

        Ok(())
    }
}

async fn run_owner_command(
    service: &LedgerService,
    config: &Config,
    cmd: OwnerCommands,
) -> Result<()> {
    match cmd {
        OwnerCommands::Create { username } => {
            let owner = service.register_owner(&username).await?;
            println!("Created owner: {} (#{})", owner.username, owner.id);
        }

        OwnerCommands::List => {
            let owners = service.list_owners().await?;
            println!("{:<6} {:<20} {:<20}", "ID", "USERNAME", "CREATED");
            println!("{}", "-".repeat(48));
            for owner in owners {
                println!(
                    "{:<6} {:<20} {:<20}",
                    owner.id,
                    truncate(&owner.username, 20),
                    owner.created_at.format("%Y-%m-%d %H:%M")
                );
            }
        }

        OwnerCommands::Show { username } => {
            let username = username.unwrap_or_else(|| config.owner.clone());
            let owner = service.get_owner(&username).await?;
            let balance = service.current_balance(owner.id).await?;
            let stats = service.monthly_stats(owner.id).await?;

            println!("Owner: {}", owner.username);
            println!("  ID:              {}", owner.id);
            println!(
                "  Created:         {}",
                owner.created_at.format("%Y-%m-%d %H:%M:%S")
            );
            println!("  Balance:         {}", format_cents(balance));
            println!("  This month:      {} transactions", stats.count);
        }
    }
    Ok(())
}

async fn run_transactions_command(
    service: &LedgerService,
    owner: &Owner,
    limit: Option<usize>,
) -> Result<()> {
    let transactions = service.list_transactions(owner.id, limit).await?;

    if transactions.is_empty() {
        println!("No transactions found.");
        return Ok(());
    }

    let calendar = service.calendar();
    println!(
        "{:<6} {:<12} {:<8} {:>12} {:<15} DESCRIPTION",
        "ID", "DATE", "KIND", "AMOUNT", "CATEGORY"
    );
    println!("{}", "-".repeat(75));

    for transaction in &transactions {
        println!(
            "{:<6} {:<12} {:<8} {:>12} {:<15} {}",
            transaction.id,
            calendar.date_of(transaction.date).format("%Y-%m-%d"),
            transaction.kind,
            format_cents(transaction.signed_amount()),
            truncate(&transaction.category, 15),
            truncate(&transaction.description, 30)
        );
    }
    Ok(())
}

async fn run_stats_command(
    service: &LedgerService,
    owner: &Owner,
    reference: DateTime<Utc>,
    format: &str,
) -> Result<()> {
    let stats = service.monthly_stats_at(owner.id, reference).await?;

    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
        _ => {
            let month = service.calendar().date_of(reference);
            println!("Monthly stats for {}", month.format("%B %Y"));
            println!();
            println!("  Income:        {:>12}", format_cents(stats.income));
            println!("  Expenses:      {:>12}", format_cents(stats.expenses));
            println!("  Transactions:  {:>12}", stats.count);
        }
    }
    Ok(())
}

async fn run_history_command(
    service: &LedgerService,
    owner: &Owner,
    days: i64,
    end: DateTime<Utc>,
    format: &str,
) -> Result<()> {
    match format {
        "json" => {
            let report = service.balance_history_report(owner.id, days, end).await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        "csv" => {
            let history = service.balance_history_until(owner.id, days, end).await?;
            println!("date,balance");
            for point in &history {
                println!(
                    "{},{}",
                    point.date.format("%Y-%m-%d"),
                    format_cents(point.balance)
                );
            }
        }
        _ => {
            let history = service.balance_history_until(owner.id, days, end).await?;
            println!("{:<12} {:>12} {:>12}", "DATE", "BALANCE", "CHANGE");
            println!("{}", "-".repeat(38));

            let mut previous = None;
            for point in &history {
                let change = previous
                    .map(|p| point.balance - p)
                    .filter(|delta| *delta != 0)
                    .map(format_cents)
                    .unwrap_or_default();
                println!(
                    "{:<12} {:>12} {:>12}",
                    point.date.format("%Y-%m-%d"),
                    format_cents(point.balance),
                    change
                );
                previous = Some(point.balance);
            }
        }
    }
    Ok(())
}

async fn run_export_command(
    service: &LedgerService,
    owner: &Owner,
    export_type: &str,
    output: Option<&str>,
    format: &str,
    days: i64,
    end: DateTime<Utc>,
) -> Result<()> {
    use crate::io::Exporter;
    use std::fs::File;
    use std::io::{Write, stdout};

    let exporter = Exporter::new(service);

    // Determine output writer
    let writer: Box<dyn Write> = match output {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create output file: {}", path))?;
            Box::new(file)
        }
        None => Box::new(stdout()),
    };

    match (export_type, format) {
        ("transactions", "csv") => {
            let count = exporter.export_transactions_csv(owner.id, writer).await?;
            if output.is_some() {
                eprintln!("Exported {} transactions", count);
            }
        }
        ("transactions", "json") => {
            let snapshot = exporter.export_transactions_json(owner.id, writer).await?;
            if output.is_some() {
                eprintln!("Exported {} transactions", snapshot.transactions.len());
            }
        }
        ("history", "csv") => {
            let count = exporter
                .export_history_csv(owner.id, days, end, writer)
                .await?;
            if output.is_some() {
                eprintln!("Exported {} balance points", count);
            }
        }
        ("history", "json") => {
            let report = exporter
                .export_history_json(owner.id, days, end, writer)
                .await?;
            if output.is_some() {
                eprintln!("Exported {} balance points", report.points.len());
            }
        }
        ("transactions" | "history", _) => {
            anyhow::bail!("Invalid format '{}'. Valid formats: csv, json", format);
        }
        _ => {
            anyhow::bail!(
                "Invalid export type '{}'. Valid types: transactions, history",
                export_type
            );
        }
    }

    Ok(())
}

async fn run_import_command(
    service: &LedgerService,
    owner: &Owner,
    input: Option<&str>,
    dry_run: bool,
) -> Result<()> {
    use crate::io::{ImportOptions, Importer};
    use std::fs::File;
    use std::io::{Read, stdin};

    let importer = Importer::new(service);

    // Determine input reader
    let reader: Box<dyn Read> = match input {
        Some(path) => {
            let file =
                File::open(path).with_context(|| format!("Failed to open input file: {}", path))?;
            Box::new(file)
        }
        None => Box::new(stdin()),
    };

    let result = importer
        .import_transactions_csv(owner.id, reader, ImportOptions { dry_run })
        .await?;

    if dry_run {
        println!("Validation complete");
    } else {
        println!("Import complete");
    }
    println!("  Imported: {}", result.imported);
    println!("  Errors:   {}", result.errors.len());

    if !result.errors.is_empty() {
        println!("\nErrors:");
        for error in result.errors.iter().take(10) {
            println!(
                "  Line {}: {}",
                error.line,
                error
                    .field
                    .as_ref()
                    .map(|f| format!("{}: ", f))
                    .unwrap_or_default()
                    + &error.error
            );
        }
        if result.errors.len() > 10 {
            println!("  ... and {} more errors", result.errors.len() - 10);
        }
    }

    Ok(())
}

fn parse_date_arg(service: &LedgerService, input: &str) -> Result<DateTime<Utc>> {
    service.calendar().parse_instant(input).with_context(|| {
        format!(
            "Invalid date '{}'. Use YYYY-MM-DD or an RFC 3339 timestamp",
            input
        )
    })
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let head: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", head)
    }
}
