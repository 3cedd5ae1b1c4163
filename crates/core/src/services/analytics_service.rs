use std::cmp::Ordering;

use crate::models::analytics::{
    GainLossSplit, HoldingPerformance, PerformanceMetric, PortfolioMetrics, RecoveryPotential,
    SectorAllocation, SectorPerformance, TopPerformers,
};
use crate::models::holding::Holding;
use crate::models::portfolio::Portfolio;
use crate::models::transaction::TransactionType;

/// Computes dashboard aggregates from the ledger: totals, performers,
/// sector breakdowns, realized vs unrealized results and recovery needs.
///
/// All calculations use the holdings' stored current prices; nothing here
/// fetches data or mutates the portfolio.
pub struct AnalyticsService;

impl AnalyticsService {
    pub fn new() -> Self {
        Self
    }

    pub fn metrics(&self, portfolio: &Portfolio) -> PortfolioMetrics {
        let mut metrics = PortfolioMetrics {
            holdings_count: portfolio.holdings.len(),
            ..Default::default()
        };

        for holding in &portfolio.holdings {
            metrics.total_value += holding.market_value();
            metrics.total_cost += holding.cost_basis();

            match holding.current_price.partial_cmp(&holding.avg_cost) {
                Some(Ordering::Greater) => metrics.gainers_count += 1,
                Some(Ordering::Less) => metrics.losers_count += 1,
                _ => {}
            }
        }

        metrics.total_gain_loss = metrics.total_value - metrics.total_cost;
        metrics.total_gain_loss_percent = if metrics.total_cost != 0.0 {
            metrics.total_gain_loss / metrics.total_cost * 100.0
        } else {
            0.0
        };
        metrics
    }

    /// Gain/loss figures for every holding, in portfolio order.
    pub fn holding_performance(&self, portfolio: &Portfolio) -> Vec<HoldingPerformance> {
        portfolio.holdings.iter().map(performance_of).collect()
    }

    /// Best and worst holding by `metric`. Ties go to the earliest holding.
    pub fn top_performers(&self, portfolio: &Portfolio, metric: PerformanceMetric) -> TopPerformers {
        let mut performance = self.holding_performance(portfolio);
        if performance.is_empty() {
            return TopPerformers::default();
        }

        // Stable sorts: equal values keep portfolio order.
        performance.sort_by(|a, b| by_metric(a, b, metric));
        let worst = performance.first().cloned();

        let mut descending = self.holding_performance(portfolio);
        descending.sort_by(|a, b| by_metric(b, a, metric));
        let best = descending.first().cloned();

        TopPerformers { best, worst }
    }

    /// Market value per sector (exact, case-sensitive label match), largest first.
    pub fn sector_allocation(&self, portfolio: &Portfolio) -> Vec<SectorAllocation> {
        let total_value: f64 = portfolio.holdings.iter().map(Holding::market_value).sum();

        let mut allocation: Vec<SectorAllocation> = group_by_sector(&portfolio.holdings)
            .into_iter()
            .map(|(sector, holdings)| {
                let value: f64 = holdings.iter().map(|h| h.market_value()).sum();
                SectorAllocation {
                    sector,
                    value,
                    percentage: percent_of(value, total_value),
                }
            })
            .collect();

        allocation.sort_by(|a, b| b.value.partial_cmp(&a.value).unwrap_or(Ordering::Equal));
        allocation
    }

    /// Unrealized results from current holdings, realized results from sells.
    pub fn gain_loss_split(&self, portfolio: &Portfolio) -> GainLossSplit {
        let mut split = GainLossSplit::default();

        for holding in &portfolio.holdings {
            let gain_loss = holding.unrealized_gain_loss();
            if gain_loss > 0.0 {
                split.unrealized_gain += gain_loss;
            } else {
                split.unrealized_loss += gain_loss.abs();
            }
        }

        let realized = portfolio
            .transactions
            .iter()
            .filter(|t| t.transaction_type == TransactionType::Sell)
            .filter_map(|t| t.gain_or_loss);
        for gain_loss in realized {
            if gain_loss > 0.0 {
                split.realized_gain += gain_loss;
            } else {
                split.realized_loss += gain_loss.abs();
            }
        }

        split.total_unrealized = split.unrealized_gain - split.unrealized_loss;
        split.total_realized = split.realized_gain - split.realized_loss;
        split
    }

    /// Underwater holdings, the one needing the biggest rise first.
    pub fn recovery_potential(&self, portfolio: &Portfolio) -> Vec<RecoveryPotential> {
        let mut recovery: Vec<RecoveryPotential> = portfolio
            .holdings
            .iter()
            .filter(|h| h.current_price < h.avg_cost)
            .map(|h| RecoveryPotential {
                id: h.id,
                name: h.name.clone(),
                ticker: h.ticker.clone(),
                current_price: h.current_price,
                avg_cost: h.avg_cost,
                percent_down: (h.avg_cost - h.current_price) / h.avg_cost * 100.0,
                percent_to_breakeven: (h.avg_cost / h.current_price - 1.0) * 100.0,
            })
            .collect();

        recovery.sort_by(|a, b| {
            b.percent_to_breakeven
                .partial_cmp(&a.percent_to_breakeven)
                .unwrap_or(Ordering::Equal)
        });
        recovery
    }

    /// Value, cost and return per sector, largest sector first.
    pub fn sector_performance(&self, portfolio: &Portfolio) -> Vec<SectorPerformance> {
        let portfolio_value: f64 = portfolio.holdings.iter().map(Holding::market_value).sum();

        let mut sectors: Vec<SectorPerformance> = group_by_sector(&portfolio.holdings)
            .into_iter()
            .map(|(sector, holdings)| {
                let total_value: f64 = holdings.iter().map(|h| h.market_value()).sum();
                let total_cost: f64 = holdings.iter().map(|h| h.cost_basis()).sum();
                let performance = if total_cost > 0.0 {
                    (total_value / total_cost - 1.0) * 100.0
                } else {
                    0.0
                };
                SectorPerformance {
                    sector,
                    total_value,
                    total_cost,
                    performance,
                    allocation: percent_of(total_value, portfolio_value),
                }
            })
            .collect();

        sectors.sort_by(|a, b| {
            b.total_value
                .partial_cmp(&a.total_value)
                .unwrap_or(Ordering::Equal)
        });
        sectors
    }
}

impl Default for AnalyticsService {
    fn default() -> Self {
        Self::new()
    }
}

fn performance_of(holding: &Holding) -> HoldingPerformance {
    HoldingPerformance {
        id: holding.id,
        name: holding.name.clone(),
        ticker: holding.ticker.clone(),
        sector: holding.sector.clone(),
        units: holding.units,
        avg_cost: holding.avg_cost,
        current_price: holding.current_price,
        market_value: holding.market_value(),
        gain_loss_value: holding.unrealized_gain_loss(),
        gain_loss_percent: if holding.avg_cost > 0.0 {
            (holding.current_price / holding.avg_cost - 1.0) * 100.0
        } else {
            0.0
        },
    }
}

fn by_metric(a: &HoldingPerformance, b: &HoldingPerformance, metric: PerformanceMetric) -> Ordering {
    a.metric(metric)
        .partial_cmp(&b.metric(metric))
        .unwrap_or(Ordering::Equal)
}

/// Group holdings by sector label, keeping first-seen sector order.
fn group_by_sector(holdings: &[Holding]) -> Vec<(String, Vec<&Holding>)> {
    let mut groups: Vec<(String, Vec<&Holding>)> = Vec::new();
    for holding in holdings {
        match groups.iter_mut().find(|(sector, _)| *sector == holding.sector) {
            Some((_, members)) => members.push(holding),
            None => groups.push((holding.sector.clone(), vec![holding])),
        }
    }
    groups
}

fn percent_of(value: f64, total: f64) -> f64 {
    if total == 0.0 {
        0.0
    } else {
        value / total * 100.0
    }
}
