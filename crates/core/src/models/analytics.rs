use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Portfolio-wide totals.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioMetrics {
    /// Σ units × current price
    pub total_value: f64,

    /// Σ units × average cost
    pub total_cost: f64,

    /// total_value − total_cost
    pub total_gain_loss: f64,

    /// total_gain_loss / total_cost × 100, or 0 when there is no cost
    pub total_gain_loss_percent: f64,

    pub holdings_count: usize,

    /// Holdings priced above their average cost
    pub gainers_count: usize,

    /// Holdings priced below their average cost
    pub losers_count: usize,
}

/// Which per-holding figure ranks performance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PerformanceMetric {
    /// Percentage change from average cost
    #[default]
    Percentage,
    /// Absolute gain/loss in currency
    Value,
}

/// Gain/loss figures for a single holding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HoldingPerformance {
    pub id: Uuid,
    pub name: String,
    pub ticker: String,
    pub sector: String,
    pub units: f64,
    pub avg_cost: f64,
    pub current_price: f64,
    pub market_value: f64,
    /// (current price − avg cost) × units
    pub gain_loss_value: f64,
    /// (current price / avg cost − 1) × 100
    pub gain_loss_percent: f64,
}

impl HoldingPerformance {
    pub fn metric(&self, metric: PerformanceMetric) -> f64 {
        match metric {
            PerformanceMetric::Percentage => self.gain_loss_percent,
            PerformanceMetric::Value => self.gain_loss_value,
        }
    }
}

/// Best and worst performer; both `None` for an empty portfolio.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TopPerformers {
    pub best: Option<HoldingPerformance>,
    pub worst: Option<HoldingPerformance>,
}

/// Market value grouped by sector label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectorAllocation {
    pub sector: String,
    pub value: f64,
    /// value / total portfolio value × 100
    pub percentage: f64,
}

/// Realized vs unrealized gain/loss, each split into gain and loss buckets.
/// Loss buckets hold absolute values.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GainLossSplit {
    pub unrealized_gain: f64,
    pub unrealized_loss: f64,
    pub realized_gain: f64,
    pub realized_loss: f64,
    /// unrealized_gain − unrealized_loss
    pub total_unrealized: f64,
    /// realized_gain − realized_loss
    pub total_realized: f64,
}

impl GainLossSplit {
    pub fn is_zero(&self) -> bool {
        self.unrealized_gain == 0.0
            && self.unrealized_loss == 0.0
            && self.realized_gain == 0.0
            && self.realized_loss == 0.0
    }
}

/// How far an underwater holding must rise to get back to its cost basis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecoveryPotential {
    pub id: Uuid,
    pub name: String,
    pub ticker: String,
    pub current_price: f64,
    pub avg_cost: f64,
    /// (avg cost − current price) / avg cost × 100
    pub percent_down: f64,
    /// (avg cost / current price − 1) × 100
    pub percent_to_breakeven: f64,
}

/// Value, cost and return per sector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SectorPerformance {
    pub sector: String,
    pub total_value: f64,
    pub total_cost: f64,
    /// (total_value / total_cost − 1) × 100, or 0 when there is no cost
    pub performance: f64,
    /// Share of portfolio market value, in percent
    pub allocation: f64,
}
