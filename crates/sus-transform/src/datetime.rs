//! Date normalization.
//!
//! Raw date columns come in several historical layouts, some truncated. A
//! [`DateCascade`] tries an ordered list of [`DateStrategy`] values and keeps
//! the first date produced, recording how precise it was. Truncated values
//! resolve to the first day of the month or of the year.

use chrono::{Datelike, NaiveDate};
use serde::Serialize;
use sus_model::{RecordTable, Result, SusError, UndatedPolicy};
use tracing::{info, warn};

/// Date format written to output columns.
pub const OUTPUT_DATE_FORMAT: &str = "%Y-%m-%d";

/// Two-digit years from here on belong to the 1900s.
const TWO_DIGIT_YEAR_PIVOT: i32 = 69;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum DateGranularity {
    Day,
    Month,
    Year,
}

/// A single parsing rule: a pure function from raw text to a date.
#[derive(Debug, Clone, Copy)]
pub struct DateStrategy {
    pub name: &'static str,
    pub granularity: DateGranularity,
    parse: fn(&str) -> Option<NaiveDate>,
}

impl DateStrategy {
    pub const fn new(
        name: &'static str,
        granularity: DateGranularity,
        parse: fn(&str) -> Option<NaiveDate>,
    ) -> Self {
        Self {
            name,
            granularity,
            parse,
        }
    }

    pub fn parse(&self, raw: &str) -> Option<NaiveDate> {
        (self.parse)(raw)
    }
}

fn digits(value: &str) -> Option<u32> {
    if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    value.parse().ok()
}

fn two_digit_year(value: &str) -> Option<i32> {
    if value.len() != 2 {
        return None;
    }
    let yy = i32::try_from(digits(value)?).ok()?;
    Some(if yy >= TWO_DIGIT_YEAR_PIVOT {
        1900 + yy
    } else {
        2000 + yy
    })
}

fn four_digit_year(value: &str) -> Option<i32> {
    if value.len() != 4 {
        return None;
    }
    i32::try_from(digits(value)?).ok()
}

fn last(value: &str, len: usize) -> Option<&str> {
    value.len().checked_sub(len).and_then(|start| value.get(start..))
}

fn first(value: &str, len: usize) -> Option<&str> {
    value.get(..len)
}

/// `ddmmyyyy`
pub fn parse_ddmmyyyy(raw: &str) -> Option<NaiveDate> {
    if raw.len() != 8 {
        return None;
    }
    let day = digits(raw.get(..2)?)?;
    let month = digits(raw.get(2..4)?)?;
    NaiveDate::from_ymd_opt(four_digit_year(raw.get(4..)?)?, month, day)
}

/// Last six characters as `mmyyyy`, first of the month.
pub fn parse_trailing_mmyyyy(raw: &str) -> Option<NaiveDate> {
    let tail = last(raw, 6)?;
    let month = digits(tail.get(..2)?)?;
    NaiveDate::from_ymd_opt(four_digit_year(tail.get(2..)?)?, month, 1)
}

/// Last four characters as `yyyy`, first of January.
pub fn parse_trailing_yyyy(raw: &str) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(four_digit_year(last(raw, 4)?)?, 1, 1)
}

/// `yymmdd`
pub fn parse_yymmdd(raw: &str) -> Option<NaiveDate> {
    if raw.len() != 6 {
        return None;
    }
    let month = digits(raw.get(2..4)?)?;
    let day = digits(raw.get(4..)?)?;
    NaiveDate::from_ymd_opt(two_digit_year(raw.get(..2)?)?, month, day)
}

/// First four characters as `yymm`, first of the month.
pub fn parse_leading_yymm(raw: &str) -> Option<NaiveDate> {
    let head = first(raw, 4)?;
    let month = digits(head.get(2..)?)?;
    NaiveDate::from_ymd_opt(two_digit_year(head.get(..2)?)?, month, 1)
}

/// First two characters as `yy`, first of January.
pub fn parse_leading_yy(raw: &str) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(two_digit_year(first(raw, 2)?)?, 1, 1)
}

/// `dd/mm/yyyy`
pub fn parse_slashed_dmy(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%d/%m/%Y").ok()
}

/// ISO `yyyy-mm-dd`, as written by [`OUTPUT_DATE_FORMAT`].
pub fn parse_iso(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw, OUTPUT_DATE_FORMAT).ok()
}

pub fn format_date(date: NaiveDate) -> String {
    date.format(OUTPUT_DATE_FORMAT).to_string()
}

/// Ordered strategies; the first one producing a date wins.
#[derive(Debug, Clone)]
pub struct DateCascade {
    strategies: Vec<DateStrategy>,
}

impl DateCascade {
    pub fn new(strategies: Vec<DateStrategy>) -> Self {
        Self { strategies }
    }

    /// SIM death date from 1996 on (`DTOBITO`).
    pub fn modern_sim() -> Self {
        Self::new(vec![
            DateStrategy::new("ddmmyyyy", DateGranularity::Day, parse_ddmmyyyy),
            DateStrategy::new("mmyyyy", DateGranularity::Month, parse_trailing_mmyyyy),
            DateStrategy::new("yyyy", DateGranularity::Year, parse_trailing_yyyy),
        ])
    }

    /// SIM death date before 1996 (`DATAOBITO`).
    pub fn legacy_sim() -> Self {
        Self::new(vec![
            DateStrategy::new("yymmdd", DateGranularity::Day, parse_yymmdd),
            DateStrategy::new("yymm", DateGranularity::Month, parse_leading_yymm),
            DateStrategy::new("yy", DateGranularity::Year, parse_leading_yy),
        ])
    }

    /// SIVEP dates (`DT_SIN_PRI` and friends).
    pub fn sivep() -> Self {
        Self::new(vec![DateStrategy::new(
            "dd/mm/yyyy",
            DateGranularity::Day,
            parse_slashed_dmy,
        )])
    }

    pub fn strategies(&self) -> &[DateStrategy] {
        &self.strategies
    }

    pub fn resolve(&self, raw: &str) -> Option<(NaiveDate, DateGranularity)> {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }
        self.strategies
            .iter()
            .find_map(|strategy| strategy.parse(raw).map(|date| (date, strategy.granularity)))
    }
}

/// A source column and the cascade used to read it.
#[derive(Debug, Clone)]
pub struct DateSource {
    pub column: String,
    pub cascade: DateCascade,
}

impl DateSource {
    pub fn new(column: impl Into<String>, cascade: DateCascade) -> Self {
        Self {
            column: column.into(),
            cascade,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DateReport {
    pub input_rows: usize,
    pub day: usize,
    pub month: usize,
    pub year: usize,
    /// Records for which no source produced a date.
    pub undated: usize,
    /// Undated records removed from the table.
    pub dropped: usize,
}

impl DateReport {
    fn count(&mut self, granularity: DateGranularity) {
        match granularity {
            DateGranularity::Day => self.day += 1,
            DateGranularity::Month => self.month += 1,
            DateGranularity::Year => self.year += 1,
        }
    }
}

/// Fill `output` with the first date the sources produce for each record.
///
/// Sources are tried in order, skipping empty values. Undated records are
/// dropped or kept with an empty date according to `policy`.
pub fn normalize_dates(
    table: &mut RecordTable,
    sources: &[DateSource],
    output: &str,
    policy: UndatedPolicy,
) -> Result<DateReport> {
    let indexes = sources
        .iter()
        .map(|source| table.require_column(&source.column, "date sources"))
        .collect::<Result<Vec<_>>>()?;

    let mut report = DateReport {
        input_rows: table.row_count(),
        ..DateReport::default()
    };
    let mut values = Vec::with_capacity(table.row_count());
    for row in &table.rows {
        let resolved = sources
            .iter()
            .zip(&indexes)
            .find_map(|(source, &idx)| source.cascade.resolve(&row[idx]));
        match resolved {
            Some((date, granularity)) => {
                report.count(granularity);
                values.push(format_date(date));
            }
            None => {
                report.undated += 1;
                values.push(String::new());
            }
        }
    }
    let date_idx = table.set_column(output, values)?;

    if policy == UndatedPolicy::Drop {
        report.dropped = table.retain_rows(|row| !row[date_idx].is_empty());
    }
    SusError::ensure_row_count(
        "date normalization",
        report.input_rows - report.dropped,
        table.row_count(),
    )?;

    if report.undated > 0 {
        warn!(
            undated = report.undated,
            dropped = report.dropped,
            "records without a parseable date"
        );
    }
    info!(
        rows = table.row_count(),
        day = report.day,
        month = report.month,
        year = report.year,
        "dates normalized"
    );
    Ok(report)
}

/// Acceptance rule for secondary date columns: the trailing `/yyyy` token must
/// be a listed year and the date must not be after `latest`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionalDatePolicy {
    pub years: Vec<i32>,
    pub latest: NaiveDate,
}

impl OptionalDatePolicy {
    pub fn accept(&self, raw: &str) -> Option<NaiveDate> {
        let raw = raw.trim();
        let (_, year) = raw.rsplit_once('/')?;
        let year = four_digit_year(year)?;
        if !self.years.contains(&year) {
            return None;
        }
        parse_slashed_dmy(raw)
            .filter(|date| *date <= self.latest && date.year() == year)
    }
}

/// Rewrite optional date columns as ISO dates, blanking every value the
/// policy rejects. Returns the number of non-empty values blanked.
pub fn clean_optional_dates(
    table: &mut RecordTable,
    columns: &[&str],
    policy: &OptionalDatePolicy,
) -> Result<usize> {
    let mut rejected = 0usize;
    for column in columns {
        let idx = table.require_column(column, "optional dates")?;
        for row in &mut table.rows {
            let raw = std::mem::take(&mut row[idx]);
            match policy.accept(&raw) {
                Some(date) => row[idx] = format_date(date),
                None if !raw.trim().is_empty() => rejected += 1,
                None => {}
            }
        }
    }
    if rejected > 0 {
        info!(rejected, "optional dates outside the accepted range");
    }
    Ok(rejected)
}

/// Days from `start` to `end` (ISO dates), clipped at zero. Zero when either
/// side is missing.
pub fn date_diff_days(start: &str, end: &str) -> i64 {
    match (parse_iso(start), parse_iso(end)) {
        (Some(start), Some(end)) => (end - start).num_days().max(0),
        _ => 0,
    }
}

/// Add `output` holding the day difference between two ISO date columns.
pub fn add_date_diff(table: &mut RecordTable, output: &str, start: &str, end: &str) -> Result<()> {
    let start_idx = table.require_column(start, "date difference")?;
    let end_idx = table.require_column(end, "date difference")?;
    let values = table
        .rows
        .iter()
        .map(|row| date_diff_days(&row[start_idx], &row[end_idx]).to_string())
        .collect();
    table.set_column(output, values)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    #[test]
    fn modern_cascade_truncates() {
        let cascade = DateCascade::modern_sim();
        assert_eq!(
            cascade.resolve("15031996"),
            Some((ymd(1996, 3, 15), DateGranularity::Day))
        );
        assert_eq!(
            cascade.resolve("031996"),
            Some((ymd(1996, 3, 1), DateGranularity::Month))
        );
        assert_eq!(
            cascade.resolve("1996"),
            Some((ymd(1996, 1, 1), DateGranularity::Year))
        );
        assert_eq!(
            cascade.resolve("99131996"),
            Some((ymd(1996, 1, 1), DateGranularity::Year))
        );
        assert_eq!(cascade.resolve(""), None);
        assert_eq!(cascade.resolve("abc"), None);
    }

    #[test]
    fn legacy_cascade_pivots_two_digit_years() {
        let cascade = DateCascade::legacy_sim();
        assert_eq!(
            cascade.resolve("950315"),
            Some((ymd(1995, 3, 15), DateGranularity::Day))
        );
        assert_eq!(
            cascade.resolve("9503"),
            Some((ymd(1995, 3, 1), DateGranularity::Month))
        );
        assert_eq!(
            cascade.resolve("95"),
            Some((ymd(1995, 1, 1), DateGranularity::Year))
        );
        assert_eq!(
            cascade.resolve("680101"),
            Some((ymd(2068, 1, 1), DateGranularity::Day))
        );
        assert_eq!(
            cascade.resolve("690101"),
            Some((ymd(1969, 1, 1), DateGranularity::Day))
        );
    }

    #[test]
    fn optional_dates_need_listed_year_and_past() {
        let policy = OptionalDatePolicy {
            years: vec![2019, 2020, 2021],
            latest: ymd(2021, 6, 1),
        };
        assert_eq!(policy.accept("10/03/2020"), Some(ymd(2020, 3, 10)));
        assert_eq!(policy.accept("10/03/2018"), None);
        assert_eq!(policy.accept("10/07/2021"), None);
        assert_eq!(policy.accept("2020"), None);
        assert_eq!(policy.accept(""), None);
    }

    #[test]
    fn date_difference_clips_at_zero() {
        assert_eq!(date_diff_days("2020-03-01", "2020-03-11"), 10);
        assert_eq!(date_diff_days("2020-03-11", "2020-03-01"), 0);
        assert_eq!(date_diff_days("", "2020-03-01"), 0);
    }
}
