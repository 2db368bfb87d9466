//! Top-5 sales figures for the admin dashboard.

use chrono::{DateTime, Days, NaiveDate, TimeZone, Utc};

use crate::db::statistics::{StatisticsRepository, TopCustomerRow, TopProductRow};
use crate::error::{AppError, ResultExt};
use crate::state::AppState;

const MONTHLY_PRODUCTS_ERROR: &str = "Error getting top 5 monthly selling products";
const BEST_PRODUCTS_ERROR: &str = "Error getting top 5 best selling products";
const CUSTOMERS_ERROR: &str = "Error getting top 5 customers";
const MONTHLY_CUSTOMERS_ERROR: &str = "Error getting top 5 monthly customers";

fn midnight(date: NaiveDate) -> Option<DateTime<Utc>> {
    date.and_hms_opt(0, 0, 0).map(|d| Utc.from_utc_datetime(&d))
}

/// `[start, end]` as whole days.
fn date_range(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
    let (start, end) = (start?, end?);
    if end < start { return None; }
    Some((midnight(start)?, midnight(end.checked_add_days(Days::new(1))?)?))
}

/// The whole calendar month.
fn month_range(month: u32, year: i32) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
    if year <= 0 { return None; }
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let next = if month == 12 { NaiveDate::from_ymd_opt(year + 1, 1, 1)? } else { NaiveDate::from_ymd_opt(year, month + 1, 1)? };
    Some((midnight(first)?, midnight(next)?))
}

/// Covers every order ever placed.
fn all_time() -> (DateTime<Utc>, DateTime<Utc>) {
    (DateTime::<Utc>::default(), Utc::now() + chrono::Duration::days(1))
}

pub struct StatisticService<'a> { state: &'a AppState }

impl<'a> StatisticService<'a> {
    pub const fn new(state: &'a AppState) -> Self { Self { state } }

    fn stats(&self) -> StatisticsRepository<'a> { StatisticsRepository::new(self.state.db()) }

    pub async fn top5_monthly_selling_products(&self, start: Option<NaiveDate>, end: Option<NaiveDate>) -> Result<Vec<TopProductRow>, AppError> {
        let (from, to) = date_range(start, end).ok_or_else(|| AppError::system(MONTHLY_PRODUCTS_ERROR))?;
        self.stats().top_products(from, to).await.or_system(MONTHLY_PRODUCTS_ERROR)
    }

    pub async fn top5_best_selling_products(&self) -> Result<Vec<TopProductRow>, AppError> {
        let (from, to) = all_time();
        self.stats().top_products(from, to).await.or_system(BEST_PRODUCTS_ERROR)
    }

    pub async fn top5_best_customers(&self) -> Result<Vec<TopCustomerRow>, AppError> {
        let (from, to) = all_time();
        self.stats().top_customers(from, to).await.or_system(CUSTOMERS_ERROR)
    }

    pub async fn top5_monthly_customers(&self, month: Option<u32>, year: Option<i32>) -> Result<Vec<TopCustomerRow>, AppError> {
        let (from, to) = month
            .zip(year)
            .and_then(|(m, y)| month_range(m, y))
            .ok_or_else(|| AppError::system(MONTHLY_CUSTOMERS_ERROR))?;
        self.stats().top_customers(from, to).await.or_system(MONTHLY_CUSTOMERS_ERROR)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate { NaiveDate::from_ymd_opt(y, m, d).unwrap() }

    #[test]
    fn month_range_spans_calendar_month() {
        let (from, to) = month_range(12, 2024).unwrap();
        assert_eq!(from.to_rfc3339(), "2024-12-01T00:00:00+00:00");
        assert_eq!(to.to_rfc3339(), "2025-01-01T00:00:00+00:00");
        let (_, to) = month_range(2, 2024).unwrap();
        assert_eq!(to.date_naive(), day(2024, 3, 1));
    }

    #[test]
    fn month_range_rejects_bad_input() {
        assert!(month_range(0, 2024).is_none());
        assert!(month_range(13, 2024).is_none());
        assert!(month_range(5, 0).is_none());
    }

    #[test]
    fn date_range_includes_end_day() {
        let (from, to) = date_range(Some(day(2024, 6, 1)), Some(day(2024, 6, 30))).unwrap();
        assert_eq!(from.date_naive(), day(2024, 6, 1));
        assert_eq!(to.date_naive(), day(2024, 7, 1));
        assert!(date_range(None, Some(day(2024, 6, 1))).is_none());
        assert!(date_range(Some(day(2024, 6, 2)), Some(day(2024, 6, 1))).is_none());
    }
}
