use std::collections::BTreeMap;

use chrono::{DateTime, Days, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::{Calendar, Cents, Transaction, TransactionKind};

/// Longest balance history we will build (about a century of days).
pub const MAX_HISTORY_DAYS: i64 = 36_600;

/// Month-to-date totals. Income and expenses are reported separately, never netted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthlyStats {
    pub income: Cents,
    pub expenses: Cents,
    pub count: i64,
}

/// Balance at the end of one calendar day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalancePoint {
    pub date: NaiveDate,
    pub balance: Cents,
}

/// Running balance over every given transaction: income adds, expense subtracts.
pub fn compute_balance(transactions: &[Transaction]) -> Cents {
    transactions
        .iter()
        .map(Transaction::signed_amount)
        .fold(0, Cents::saturating_add)
}

/// Totals for transactions dated between the start of `reference`'s month and
/// `reference` itself, both inclusive.
pub fn monthly_stats(
    transactions: &[Transaction],
    reference: DateTime<Utc>,
    calendar: &Calendar,
) -> MonthlyStats {
    let month_start = calendar.start_of_month(reference);

    transactions
        .iter()
        .filter(|t| t.date >= month_start && t.date <= reference)
        .fold(MonthlyStats::default(), |mut stats, t| {
            match t.kind {
                TransactionKind::Income => {
                    stats.income = stats.income.saturating_add(t.amount_cents)
                }
                TransactionKind::Expense => {
                    stats.expenses = stats.expenses.saturating_add(t.amount_cents)
                }
            }
            stats.count += 1;
            stats
        })
}

/// One balance point per calendar day, from `days` days before `end` up to
/// the day of `end`, ascending and without gaps.
///
/// Transactions before the first day seed the balance, so the series starts
/// from the real balance instead of zero. A transaction counts on the day it
/// falls on in `calendar`, whatever its time of day; anything dated after the
/// last day is ignored. A non-positive `days` collapses the window to the
/// single day of `end`.
///
/// `days` is clamped to [`MAX_HISTORY_DAYS`], so the series never has more
/// than `MAX_HISTORY_DAYS + 1` points. A window reaching past the earliest
/// representable date starts at that date and is shorter accordingly.
pub fn balance_history(
    transactions: &[Transaction],
    days: i64,
    end: DateTime<Utc>,
    calendar: &Calendar,
) -> Vec<BalancePoint> {
    let days = days.clamp(0, MAX_HISTORY_DAYS);
    let last_day = calendar.date_of(end);
    let first_day = last_day
        .checked_sub_days(Days::new(days as u64))
        .unwrap_or(NaiveDate::MIN);
    let window_start = calendar.start_of_day(first_day);

    let mut running: Cents = 0;
    let mut daily_deltas: BTreeMap<NaiveDate, Cents> = BTreeMap::new();

    for transaction in transactions {
        if transaction.date < window_start {
            running = running.saturating_add(transaction.signed_amount());
            continue;
        }

        let day = calendar.date_of(transaction.date);
        if day <= last_day {
            let delta = daily_deltas.entry(day).or_insert(0);
            *delta = delta.saturating_add(transaction.signed_amount());
        }
    }

    let mut history = Vec::with_capacity(days as usize + 1);
    for date in first_day.iter_days().take_while(|date| *date <= last_day) {
        running = running.saturating_add(daily_deltas.get(&date).copied().unwrap_or(0));
        history.push(BalancePoint {
            date,
            balance: running,
        });
    }

    history
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    fn day(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn make_transaction(
        id: i64,
        kind: TransactionKind,
        amount_cents: Cents,
        date: &str,
    ) -> Transaction {
        Transaction {
            id,
            owner_id: 1,
            kind,
            amount_cents,
            description: format!("transaction {}", id),
            category: "misc".to_string(),
            date: at(date),
            recorded_at: at(date),
        }
    }

    fn income(id: i64, amount_cents: Cents, date: &str) -> Transaction {
        make_transaction(id, TransactionKind::Income, amount_cents, date)
    }

    fn expense(id: i64, amount_cents: Cents, date: &str) -> Transaction {
        make_transaction(id, TransactionKind::Expense, amount_cents, date)
    }

    #[test]
    fn test_compute_balance_empty() {
        assert_eq!(compute_balance(&[]), 0);
    }

    #[test]
    fn test_compute_balance_mixed() {
        let transactions = vec![
            income(1, 500000, "2024-01-01T09:00:00Z"),
            expense(2, 150000, "2024-01-03T09:00:00Z"),
            expense(3, 2550, "2024-01-04T09:00:00Z"),
        ];
        assert_eq!(compute_balance(&transactions), 347450);
    }

    #[test]
    fn test_balance_may_go_negative() {
        let transactions = vec![expense(1, 1000, "2024-01-01T09:00:00Z")];
        assert_eq!(compute_balance(&transactions), -1000);
    }

    #[test]
    fn test_balance_history_example() {
        let transactions = vec![
            income(1, 10000, "2024-01-01T10:00:00Z"),
            expense(2, 3000, "2024-01-05T18:30:00Z"),
        ];

        let history = balance_history(
            &transactions,
            10,
            at("2024-01-10T12:00:00Z"),
            &Calendar::utc(),
        );

        assert_eq!(history.len(), 11);
        assert_eq!(history[0], BalancePoint { date: day("2023-12-31"), balance: 0 });
        assert_eq!(history[1], BalancePoint { date: day("2024-01-01"), balance: 10000 });
        assert_eq!(history[4].balance, 10000);
        assert_eq!(history[5], BalancePoint { date: day("2024-01-05"), balance: 7000 });
        assert_eq!(history[10], BalancePoint { date: day("2024-01-10"), balance: 7000 });
    }

    #[test]
    fn test_balance_history_seeds_from_earlier_transactions() {
        let transactions = vec![
            income(1, 20000, "2023-06-01T00:00:00Z"),
            expense(2, 5000, "2023-12-31T23:59:59Z"),
            income(3, 1000, "2024-01-02T00:00:00Z"),
        ];

        let history = balance_history(
            &transactions,
            2,
            at("2024-01-03T08:00:00Z"),
            &Calendar::utc(),
        );

        let balances: Vec<Cents> = history.iter().map(|p| p.balance).collect();
        assert_eq!(balances, vec![15000, 16000, 16000]);
        assert_eq!(history[0].date, day("2024-01-01"));
    }

    #[test]
    fn test_balance_history_counts_whole_first_day() {
        // Early on the first day, before the time-of-day of `end`
        let transactions = vec![income(1, 700, "2024-01-01T01:00:00Z")];

        let history = balance_history(
            &transactions,
            1,
            at("2024-01-02T15:00:00Z"),
            &Calendar::utc(),
        );

        assert_eq!(history[0], BalancePoint { date: day("2024-01-01"), balance: 700 });
        assert_eq!(history[1].balance, 700);
    }

    #[test]
    fn test_balance_history_ignores_days_after_end() {
        let transactions = vec![
            income(1, 1000, "2024-01-01T12:00:00Z"),
            income(2, 9999, "2024-01-04T12:00:00Z"),
        ];

        let history = balance_history(
            &transactions,
            2,
            at("2024-01-03T12:00:00Z"),
            &Calendar::utc(),
        );

        assert_eq!(history.last().unwrap().balance, 1000);
    }

    #[test]
    fn test_balance_history_includes_later_same_day() {
        let transactions = vec![income(1, 1000, "2024-01-03T20:00:00Z")];

        let history = balance_history(
            &transactions,
            0,
            at("2024-01-03T08:00:00Z"),
            &Calendar::utc(),
        );

        assert_eq!(
            history,
            vec![BalancePoint { date: day("2024-01-03"), balance: 1000 }]
        );
    }

    #[test]
    fn test_balance_history_non_positive_window_is_single_point() {
        let transactions = vec![income(1, 1000, "2024-01-01T00:00:00Z")];
        let end = at("2024-01-10T00:00:00Z");

        for days in [0, -1, -30] {
            let history = balance_history(&transactions, days, end, &Calendar::utc());
            assert_eq!(
                history,
                vec![BalancePoint { date: day("2024-01-10"), balance: 1000 }]
            );
        }
    }

    #[test]
    fn test_balance_history_uses_calendar_offset() {
        // 23:30 UTC on the 1st is already the 2nd in UTC+01:00
        let transactions = vec![income(1, 500, "2024-01-01T23:30:00Z")];
        let end = at("2024-01-02T12:00:00Z");

        let utc = balance_history(&transactions, 1, end, &Calendar::utc());
        assert_eq!(utc[0].balance, 500);

        let plus_one = Calendar::parse("+01:00").unwrap();
        let shifted = balance_history(&transactions, 1, end, &plus_one);
        assert_eq!(shifted[0], BalancePoint { date: day("2024-01-01"), balance: 0 });
        assert_eq!(shifted[1], BalancePoint { date: day("2024-01-02"), balance: 500 });
    }

    #[test]
    fn test_balance_history_deltas_sum_to_change() {
        let transactions = vec![
            income(1, 40000, "2023-11-20T10:00:00Z"),
            expense(2, 1200, "2024-01-03T10:00:00Z"),
            income(3, 800, "2024-01-03T22:00:00Z"),
            expense(4, 15000, "2024-01-07T07:00:00Z"),
            income(5, 3300, "2024-01-15T13:00:00Z"),
        ];
        let end = at("2024-01-15T23:00:00Z");

        let history = balance_history(&transactions, 14, end, &Calendar::utc());
        let seed = 40000;

        let deltas: Cents = history
            .windows(2)
            .map(|pair| pair[1].balance - pair[0].balance)
            .sum::<Cents>()
            + (history[0].balance - seed);

        assert_eq!(history.len(), 15);
        assert_eq!(deltas, history.last().unwrap().balance - seed);
        assert_eq!(history.last().unwrap().balance, compute_balance(&transactions));
        assert!(history.windows(2).all(|pair| pair[0].date.succ_opt() == Some(pair[1].date)));
    }

    #[test]
    fn test_balance_history_clamps_long_windows() {
        let transactions = vec![income(1, 500, "1990-06-01T12:00:00Z")];
        let end = at("2024-01-10T12:00:00Z");

        let at_limit = balance_history(&transactions, MAX_HISTORY_DAYS, end, &Calendar::utc());
        assert_eq!(at_limit.len(), MAX_HISTORY_DAYS as usize + 1);
        assert_eq!(at_limit.last().unwrap().date, day("2024-01-10"));
        assert_eq!(at_limit.last().unwrap().balance, 500);

        let beyond = balance_history(&transactions, i64::MAX, end, &Calendar::utc());
        assert_eq!(beyond, at_limit);
    }

    #[test]
    fn test_balance_history_stops_at_earliest_date() {
        let end = DateTime::<Utc>::MIN_UTC + chrono::Duration::days(2);

        let history = balance_history(&[], 10, end, &Calendar::utc());

        assert_eq!(history.len(), 3);
        assert_eq!(history[0].date, NaiveDate::MIN);
    }

    #[test]
    fn test_folds_saturate_instead_of_overflowing() {
        let transactions = vec![
            income(1, i64::MAX, "2024-01-01T10:00:00Z"),
            income(2, i64::MAX, "2024-01-02T10:00:00Z"),
        ];

        assert_eq!(compute_balance(&transactions), i64::MAX);

        let history =
            balance_history(&transactions, 3, at("2024-01-02T12:00:00Z"), &Calendar::utc());
        assert_eq!(history.last().unwrap().balance, i64::MAX);

        let stats = monthly_stats(&transactions, at("2024-01-31T00:00:00Z"), &Calendar::utc());
        assert_eq!(stats.income, i64::MAX);
        assert_eq!(stats.count, 2);
    }

    #[test]
    fn test_monthly_stats() {
        let transactions = vec![
            income(1, 100000, "2024-01-31T23:59:59Z"),
            income(2, 250000, "2024-02-01T00:00:00Z"),
            expense(3, 4000, "2024-02-10T12:00:00Z"),
            expense(4, 6000, "2024-02-14T12:00:00Z"),
            // after the reference time
            expense(5, 9999, "2024-02-20T12:00:00Z"),
        ];

        let stats = monthly_stats(&transactions, at("2024-02-15T00:00:00Z"), &Calendar::utc());

        assert_eq!(
            stats,
            MonthlyStats {
                income: 250000,
                expenses: 10000,
                count: 3,
            }
        );
    }

    #[test]
    fn test_monthly_stats_includes_reference_instant() {
        let transactions = vec![expense(1, 100, "2024-03-05T10:00:00Z")];
        let stats = monthly_stats(&transactions, at("2024-03-05T10:00:00Z"), &Calendar::utc());
        assert_eq!(stats.count, 1);
    }

    #[test]
    fn test_monthly_stats_month_boundary_follows_offset() {
        // 2024-01-31T23:30Z is February 1st in UTC+02:00
        let transactions = vec![income(1, 1000, "2024-01-31T23:30:00Z")];
        let reference = at("2024-02-10T00:00:00Z");

        let utc = monthly_stats(&transactions, reference, &Calendar::utc());
        assert_eq!(utc.count, 0);

        let plus_two = Calendar::parse("+02:00").unwrap();
        let local = monthly_stats(&transactions, reference, &plus_two);
        assert_eq!(local.count, 1);
        assert_eq!(local.income, 1000);
    }
}
