use chrono::{Datelike, Duration, NaiveDate};
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::errors::CoreError;
use crate::models::dividend::{
    CalendarDay, Dividend, DividendCalendar, DividendSummary, MonthlyDividends, NewDividend,
};

/// Dividend bookkeeping and the views built on it: the upcoming list,
/// income projections, monthly history and the month calendar.
pub struct DividendService;

impl DividendService {
    pub fn new() -> Self {
        Self
    }

    pub fn create(&self, new: NewDividend) -> Result<Dividend, CoreError> {
        let ticker = new.ticker.trim().to_uppercase();
        if ticker.is_empty() {
            return Err(CoreError::ValidationError("Ticker must not be empty".into()));
        }
        require_non_negative("Amount per share", new.amount_per_share)?;
        require_non_negative("Units", new.units)?;
        if new.payment_date < new.ex_date {
            return Err(CoreError::ValidationError(format!(
                "Payment date {} is before ex-dividend date {}",
                new.payment_date, new.ex_date
            )));
        }

        Ok(Dividend {
            id: Uuid::new_v4(),
            stock_id: new.stock_id,
            ticker,
            stock_name: new.stock_name,
            ex_date: new.ex_date,
            payment_date: new.payment_date,
            amount_per_share: new.amount_per_share,
            units: new.units,
            total_amount: new.amount_per_share * new.units,
            frequency: new.frequency,
            reinvested: new.reinvested,
            notes: new.notes,
        })
    }

    /// Dividends going ex within `window_days` from `today` (inclusive), soonest first.
    pub fn upcoming(&self, dividends: &[Dividend], today: NaiveDate, window_days: i64) -> Vec<Dividend> {
        let end = Duration::try_days(window_days)
            .and_then(|window| today.checked_add_signed(window))
            .unwrap_or(NaiveDate::MAX);
        let mut upcoming: Vec<Dividend> = dividends
            .iter()
            .filter(|d| d.ex_date >= today && d.ex_date <= end)
            .cloned()
            .collect();
        upcoming.sort_by_key(|d| d.ex_date);
        upcoming
    }

    /// Projected yearly income: the latest dividend of each ticker, annualised.
    pub fn annual_income(&self, dividends: &[Dividend]) -> f64 {
        let mut latest: BTreeMap<&str, &Dividend> = BTreeMap::new();
        for dividend in dividends {
            latest
                .entry(dividend.ticker.as_str())
                .and_modify(|d| {
                    if dividend.ex_date > d.ex_date {
                        *d = dividend;
                    }
                })
                .or_insert(dividend);
        }

        latest
            .values()
            .map(|d| d.total_amount * d.frequency.payments_per_year())
            .sum()
    }

    pub fn portfolio_yield(&self, dividends: &[Dividend], portfolio_value: f64) -> f64 {
        if portfolio_value <= 0.0 {
            return 0.0;
        }
        self.annual_income(dividends) / portfolio_value * 100.0
    }

    pub fn summary(&self, dividends: &[Dividend], portfolio_value: f64) -> DividendSummary {
        let annual_income = self.annual_income(dividends);
        DividendSummary {
            annual_income,
            portfolio_yield: self.portfolio_yield(dividends, portfolio_value),
            monthly_average: annual_income / 12.0,
        }
    }

    /// Received payments grouped by payment month, oldest month first.
    pub fn monthly_history(&self, dividends: &[Dividend], today: NaiveDate) -> Vec<MonthlyDividends> {
        let mut months: BTreeMap<String, MonthlyDividends> = BTreeMap::new();

        for dividend in dividends.iter().filter(|d| d.payment_date <= today) {
            let key = dividend.payment_date.format("%Y-%m").to_string();
            let entry = months.entry(key.clone()).or_insert_with(|| MonthlyDividends {
                month: key,
                total: 0.0,
                reinvested: 0.0,
                cash: 0.0,
            });
            entry.total += dividend.total_amount;
            if dividend.reinvested {
                entry.reinvested += dividend.total_amount;
            } else {
                entry.cash += dividend.total_amount;
            }
        }

        months.into_values().collect()
    }

    /// Lay out one month day by day with its ex-dividend and payment events.
    pub fn calendar(&self, dividends: &[Dividend], year: i32, month: u32) -> Result<DividendCalendar, CoreError> {
        let first = NaiveDate::from_ymd_opt(year, month, 1).ok_or_else(|| {
            CoreError::ValidationError(format!("Invalid calendar month: {year}-{month}"))
        })?;

        let days = first
            .iter_days()
            .take_while(|d| d.month() == month)
            .map(|date| CalendarDay {
                date,
                ex_dividends: dividends.iter().filter(|d| d.ex_date == date).cloned().collect(),
                payments: dividends
                    .iter()
                    .filter(|d| d.payment_date == date)
                    .cloned()
                    .collect(),
            })
            .collect();

        Ok(DividendCalendar {
            year,
            month,
            first_weekday: first.weekday().num_days_from_sunday(),
            days,
        })
    }
}

impl Default for DividendService {
    fn default() -> Self {
        Self::new()
    }
}

fn require_non_negative(field: &str, value: f64) -> Result<(), CoreError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(CoreError::ValidationError(format!(
            "{field} must be a non-negative number, got {value}"
        )))
    }
}
