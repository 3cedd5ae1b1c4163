use std::cmp::Ordering;

use crate::models::analytics::{
    GainLossSplit, HoldingPerformance, PerformanceMetric, RecoveryPotential, SectorAllocation,
    SectorPerformance,
};
use crate::models::chart::{ChartData, ChartDataset, ChartKind, DashboardCharts};
use crate::models::holding::Holding;
use crate::models::portfolio::Portfolio;
use crate::services::analytics_service::AnalyticsService;
use crate::utils::range_position;

/// How many holdings each side of the gainers/losers chart shows.
pub const TOP_MOVERS: usize = 5;

/// Generates chart-ready data sets from portfolio data.
///
/// Every number is computed here; the frontend only renders.
/// Every builder returns `None` when there is nothing to plot, which the
/// dashboard shows as its "no data" placeholder.
pub struct ChartService {
    analytics: AnalyticsService,
}

impl ChartService {
    pub fn new() -> Self {
        Self {
            analytics: AnalyticsService::new(),
        }
    }

    /// Every dashboard chart for the current ledger.
    pub fn dashboard(&self, portfolio: &Portfolio, metric: PerformanceMetric) -> DashboardCharts {
        DashboardCharts {
            allocation: self.sector_allocation(&self.analytics.sector_allocation(portfolio)),
            gainers_losers: self
                .gainers_losers(&self.analytics.holding_performance(portfolio), metric),
            week_range: self.week_range(&portfolio.holdings),
            recovery: self.recovery(&self.analytics.recovery_potential(portfolio)),
            realized_unrealized: self.realized_unrealized(&self.analytics.gain_loss_split(portfolio)),
            sector_performance: self
                .sector_performance(&self.analytics.sector_performance(portfolio)),
        }
    }

    /// Doughnut of market value per sector.
    pub fn sector_allocation(&self, allocation: &[SectorAllocation]) -> Option<ChartData> {
        if allocation.is_empty() {
            return None;
        }
        Some(ChartData {
            kind: ChartKind::SectorAllocation,
            labels: allocation.iter().map(|a| a.sector.clone()).collect(),
            datasets: vec![dataset("Value", allocation.iter().map(|a| a.value))],
        })
    }

    /// Worst losers (most negative first) followed by best gainers (best first),
    /// up to [`TOP_MOVERS`] of each. Flat holdings are left out.
    pub fn gainers_losers(
        &self,
        performance: &[HoldingPerformance],
        metric: PerformanceMetric,
    ) -> Option<ChartData> {
        let mut ranked: Vec<&HoldingPerformance> = performance.iter().collect();
        ranked.sort_by(|a, b| {
            b.metric(metric)
                .partial_cmp(&a.metric(metric))
                .unwrap_or(Ordering::Equal)
        });

        let gainers: Vec<&HoldingPerformance> = ranked
            .iter()
            .copied()
            .filter(|p| p.metric(metric) > 0.0)
            .take(TOP_MOVERS)
            .collect();
        let losers: Vec<&HoldingPerformance> = ranked
            .iter()
            .rev()
            .copied()
            .filter(|p| p.metric(metric) < 0.0)
            .take(TOP_MOVERS)
            .collect();

        if gainers.is_empty() && losers.is_empty() {
            return None;
        }

        let movers: Vec<&HoldingPerformance> = losers.into_iter().chain(gainers).collect();
        let label = match metric {
            PerformanceMetric::Percentage => "Performance (%)",
            PerformanceMetric::Value => "Performance ($)",
        };
        Some(ChartData {
            kind: ChartKind::GainersLosers,
            labels: movers.iter().map(|p| p.ticker.clone()).collect(),
            datasets: vec![dataset(label, movers.iter().map(|p| p.metric(metric)))],
        })
    }

    /// Where each price sits inside its 52-week range, highest first.
    /// Holdings missing either bound are skipped.
    pub fn week_range(&self, holdings: &[Holding]) -> Option<ChartData> {
        let mut positions: Vec<(&str, f64)> = holdings
            .iter()
            .filter_map(|h| match (h.low_52_week, h.high_52_week) {
                (Some(low), Some(high)) => {
                    Some((h.ticker.as_str(), range_position(h.current_price, low, high)))
                }
                _ => None,
            })
            .collect();
        if positions.is_empty() {
            return None;
        }
        positions.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));

        Some(ChartData {
            kind: ChartKind::WeekRange,
            labels: positions.iter().map(|(t, _)| t.to_string()).collect(),
            datasets: vec![dataset(
                "Position in 52-Week Range",
                positions.iter().map(|(_, p)| *p),
            )],
        })
    }

    pub fn recovery(&self, recovery: &[RecoveryPotential]) -> Option<ChartData> {
        if recovery.is_empty() {
            return None;
        }
        Some(ChartData {
            kind: ChartKind::Recovery,
            labels: recovery.iter().map(|r| r.ticker.clone()).collect(),
            datasets: vec![
                dataset("Percent Down", recovery.iter().map(|r| r.percent_down)),
                dataset(
                    "Percent to Breakeven",
                    recovery.iter().map(|r| r.percent_to_breakeven),
                ),
            ],
        })
    }

    /// Gains and losses, realized vs unrealized. `None` when all four are zero.
    pub fn realized_unrealized(&self, split: &GainLossSplit) -> Option<ChartData> {
        if split.is_zero() {
            return None;
        }
        Some(ChartData {
            kind: ChartKind::RealizedUnrealized,
            labels: vec!["Realized".into(), "Unrealized".into()],
            datasets: vec![
                dataset("Gains", [split.realized_gain, split.unrealized_gain]),
                dataset("Losses", [split.realized_loss, split.unrealized_loss]),
            ],
        })
    }

    pub fn sector_performance(&self, sectors: &[SectorPerformance]) -> Option<ChartData> {
        if sectors.is_empty() {
            return None;
        }
        Some(ChartData {
            kind: ChartKind::SectorPerformance,
            labels: sectors.iter().map(|s| s.sector.clone()).collect(),
            datasets: vec![
                dataset("Return (%)", sectors.iter().map(|s| s.performance)),
                dataset("Allocation (%)", sectors.iter().map(|s| s.allocation)),
            ],
        })
    }
}

impl Default for ChartService {
    fn default() -> Self {
        Self::new()
    }
}

fn dataset(label: &str, values: impl IntoIterator<Item = f64>) -> ChartDataset {
    ChartDataset {
        label: label.to_string(),
        values: values.into_iter().collect(),
    }
}
