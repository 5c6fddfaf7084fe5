use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, NaiveTime, Offset, Utc};
use std::fmt;

/// Maps UTC instants onto calendar days using one fixed UTC offset.
///
/// Transactions are stored in UTC. Everything that talks about "a day" or
/// "this month" goes through a `Calendar` so the boundary policy lives in a
/// single place.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Calendar {
    offset: FixedOffset,
}

impl Calendar {
    pub fn new(offset: FixedOffset) -> Self {
        Self { offset }
    }

    pub fn utc() -> Self {
        Self::new(Utc.fix())
    }

    /// Parse an offset written as `+HH:MM`, `-HH:MM`, `+HHMM`, `+HH` or `Z`.
    pub fn parse(input: &str) -> Result<Self, InvalidOffset> {
        let input = input.trim();
        if input.eq_ignore_ascii_case("z") || input.eq_ignore_ascii_case("utc") {
            return Ok(Self::utc());
        }

        let invalid = || InvalidOffset(input.to_string());

        let (sign, rest) = match input.as_bytes().first() {
            Some(b'+') => (1, &input[1..]),
            Some(b'-') => (-1, &input[1..]),
            _ => return Err(invalid()),
        };

        let digits: String = rest.chars().filter(|c| *c != ':').collect();
        if !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        let (hours, minutes) = match digits.len() {
            2 => (&digits[..2], "00"),
            4 => (&digits[..2], &digits[2..]),
            _ => return Err(invalid()),
        };

        let hours: i32 = hours.parse().map_err(|_| invalid())?;
        let minutes: i32 = minutes.parse().map_err(|_| invalid())?;
        if hours > 23 || minutes > 59 {
            return Err(invalid());
        }

        FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
            .map(Self::new)
            .ok_or_else(invalid)
    }

    pub fn offset(&self) -> FixedOffset {
        self.offset
    }

    /// The calendar day an instant falls on.
    pub fn date_of(&self, instant: DateTime<Utc>) -> NaiveDate {
        instant.with_timezone(&self.offset).date_naive()
    }

    /// The first instant of a calendar day, expressed in UTC.
    pub fn start_of_day(&self, date: NaiveDate) -> DateTime<Utc> {
        // Fixed offsets have no gaps or folds, so midnight always exists
        let midnight = date.and_time(NaiveTime::MIN);
        DateTime::<Utc>::from_naive_utc_and_offset(midnight - self.offset, Utc)
    }

    /// Read a user supplied date: either a full RFC 3339 timestamp or a plain
    /// `YYYY-MM-DD`, which means local midnight of that day.
    pub fn parse_instant(&self, input: &str) -> Option<DateTime<Utc>> {
        let input = input.trim();
        if let Ok(timestamp) = DateTime::parse_from_rfc3339(input) {
            return Some(timestamp.with_timezone(&Utc));
        }
        NaiveDate::parse_from_str(input, "%Y-%m-%d")
            .ok()
            .map(|date| self.start_of_day(date))
    }

    /// The first instant of the month containing `instant`.
    pub fn start_of_month(&self, instant: DateTime<Utc>) -> DateTime<Utc> {
        let date = self.date_of(instant);
        let first = NaiveDate::from_ymd_opt(date.year(), date.month(), 1).unwrap_or(date);
        self.start_of_day(first)
    }
}

impl Default for Calendar {
    fn default() -> Self {
        Self::utc()
    }
}

impl fmt::Display for Calendar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.offset)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidOffset(pub String);

impl fmt::Display for InvalidOffset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "invalid UTC offset '{}', expected something like +02:00",
            self.0
        )
    }
}

impl std::error::Error for InvalidOffset {}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    #[test]
    fn test_parse_offsets() {
        assert_eq!(Calendar::parse("Z").unwrap(), Calendar::utc());
        assert_eq!(Calendar::parse("+00:00").unwrap(), Calendar::utc());
        assert_eq!(
            Calendar::parse("+02:00").unwrap().offset().local_minus_utc(),
            7200
        );
        assert_eq!(
            Calendar::parse("-0530").unwrap().offset().local_minus_utc(),
            -(5 * 3600 + 30 * 60)
        );
        assert_eq!(
            Calendar::parse("+09").unwrap().offset().local_minus_utc(),
            9 * 3600
        );
    }

    #[test]
    fn test_parse_offsets_invalid() {
        assert!(Calendar::parse("02:00").is_err());
        assert!(Calendar::parse("+2:00").is_err());
        assert!(Calendar::parse("+24:00").is_err());
        assert!(Calendar::parse("+01:60").is_err());
        assert!(Calendar::parse("Europe/Rome").is_err());
    }

    #[test]
    fn test_date_of_respects_offset() {
        let instant = at("2024-01-31T23:30:00Z");
        assert_eq!(
            Calendar::utc().date_of(instant),
            NaiveDate::from_ymd_opt(2024, 1, 31).unwrap()
        );
        assert_eq!(
            Calendar::parse("+01:00").unwrap().date_of(instant),
            NaiveDate::from_ymd_opt(2024, 2, 1).unwrap()
        );
    }

    #[test]
    fn test_start_of_day_is_local_midnight() {
        let calendar = Calendar::parse("+02:00").unwrap();
        let date = NaiveDate::from_ymd_opt(2024, 3, 10).unwrap();
        assert_eq!(calendar.start_of_day(date), at("2024-03-09T22:00:00Z"));
        assert_eq!(calendar.date_of(calendar.start_of_day(date)), date);
    }

    #[test]
    fn test_parse_instant() {
        let calendar = Calendar::parse("-05:00").unwrap();
        assert_eq!(
            calendar.parse_instant("2024-06-01"),
            Some(at("2024-06-01T05:00:00Z"))
        );
        assert_eq!(
            calendar.parse_instant("2024-06-01T10:15:00+02:00"),
            Some(at("2024-06-01T08:15:00Z"))
        );
        assert_eq!(calendar.parse_instant("01/06/2024"), None);
        assert_eq!(calendar.parse_instant("2024-02-30"), None);
    }

    #[test]
    fn test_start_of_month() {
        let utc = Calendar::utc();
        assert_eq!(
            utc.start_of_month(at("2024-02-29T12:00:00Z")),
            at("2024-02-01T00:00:00Z")
        );

        // Already March in UTC+03:00
        let plus_three = Calendar::parse("+03:00").unwrap();
        assert_eq!(
            plus_three.start_of_month(at("2024-02-29T22:00:00Z")),
            at("2024-02-29T21:00:00Z")
        );
    }
}
