use serde::{Deserialize, Serialize};

use super::analytics::{
    GainLossSplit, PortfolioMetrics, RecoveryPotential, SectorAllocation, SectorPerformance,
    TopPerformers,
};
use super::holding::Holding;
use super::transaction::Transaction;

/// The "portfolio changed" broadcast: the full current state plus every
/// derived view, so subscribers never have to query back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioUpdate {
    pub holdings: Vec<Holding>,
    pub transactions: Vec<Transaction>,
    pub metrics: PortfolioMetrics,
    pub performers: TopPerformers,
    pub sector_allocation: Vec<SectorAllocation>,
    pub gain_loss: GainLossSplit,
    pub recovery: Vec<RecoveryPotential>,
    pub sector_performance: Vec<SectorPerformance>,
}
