use serde::{Deserialize, Serialize};

/// Which dashboard chart a data set feeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ChartKind {
    SectorAllocation,
    GainersLosers,
    WeekRange,
    Recovery,
    RealizedUnrealized,
    SectorPerformance,
}

/// One named series of values aligned with [`ChartData::labels`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartDataset {
    pub label: String,
    pub values: Vec<f64>,
}

/// Library-agnostic chart input.
///
/// Every number is computed here; the frontend only renders.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartData {
    pub kind: ChartKind,
    pub labels: Vec<String>,
    pub datasets: Vec<ChartDataset>,
}

impl ChartData {
    pub fn dataset(&self, label: &str) -> Option<&ChartDataset> {
        self.datasets.iter().find(|d| d.label == label)
    }
}

/// Every dashboard chart. `None` means "no data to show".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardCharts {
    pub allocation: Option<ChartData>,
    pub gainers_losers: Option<ChartData>,
    pub week_range: Option<ChartData>,
    pub recovery: Option<ChartData>,
    pub realized_unrealized: Option<ChartData>,
    pub sector_performance: Option<ChartData>,
}
