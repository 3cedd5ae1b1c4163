use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// How often a stock pays its dividend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DividendFrequency {
    Monthly,
    #[default]
    Quarterly,
    SemiAnnual,
    Annual,
}

impl DividendFrequency {
    pub fn payments_per_year(&self) -> f64 {
        match self {
            DividendFrequency::Monthly => 12.0,
            DividendFrequency::Quarterly => 4.0,
            DividendFrequency::SemiAnnual => 2.0,
            DividendFrequency::Annual => 1.0,
        }
    }
}

/// A declared or received dividend payment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dividend {
    pub id: Uuid,
    #[serde(default)]
    pub stock_id: Option<Uuid>,
    pub ticker: String,
    pub stock_name: String,
    pub ex_date: NaiveDate,
    pub payment_date: NaiveDate,
    pub amount_per_share: f64,
    pub units: f64,
    /// amount_per_share × units
    pub total_amount: f64,
    #[serde(default)]
    pub frequency: DividendFrequency,
    #[serde(default)]
    pub reinvested: bool,
    #[serde(default)]
    pub notes: String,
}

/// Input for recording a dividend.
#[derive(Debug, Clone, PartialEq)]
pub struct NewDividend {
    pub stock_id: Option<Uuid>,
    pub ticker: String,
    pub stock_name: String,
    pub ex_date: NaiveDate,
    pub payment_date: NaiveDate,
    pub amount_per_share: f64,
    pub units: f64,
    pub frequency: DividendFrequency,
    pub reinvested: bool,
    pub notes: String,
}

/// Income overview shown next to the calendar.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DividendSummary {
    pub annual_income: f64,
    /// annual_income / portfolio value × 100
    pub portfolio_yield: f64,
    pub monthly_average: f64,
}

/// Dividends paid in one calendar month.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyDividends {
    /// `YYYY-MM`
    pub month: String,
    pub total: f64,
    pub reinvested: f64,
    pub cash: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarDay {
    pub date: NaiveDate,
    pub ex_dividends: Vec<Dividend>,
    pub payments: Vec<Dividend>,
}

/// One month of dividend events laid out by day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DividendCalendar {
    pub year: i32,
    pub month: u32,
    /// Weekday of the 1st, counted from Sunday = 0
    pub first_weekday: u32,
    pub days: Vec<CalendarDay>,
}
