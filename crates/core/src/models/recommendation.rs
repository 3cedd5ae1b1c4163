use serde::{Deserialize, Serialize};

/// Advisory text blocks shown on the recommendations tab.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recommendations {
    pub diversification: String,
    pub risk: String,
    pub rebalancing: String,
    pub tax_loss: String,
    pub general: String,
}

/// Rule thresholds for generating [`Recommendations`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RecommendationThresholds {
    /// A sector above this share of market value (percent) is concentrated
    pub concentration_pct: f64,

    /// 52-week high / low above this ratio marks a holding as volatile
    pub volatility_ratio: f64,

    /// Fraction of volatile holdings above which the portfolio is flagged
    pub volatile_share: f64,

    /// Move from average cost (percent) that counts as a big gainer or loser
    pub price_move_pct: f64,
}

impl Default for RecommendationThresholds {
    fn default() -> Self {
        Self {
            concentration_pct: 25.0,
            volatility_ratio: 2.0,
            volatile_share: 0.3,
            price_move_pct: 20.0,
        }
    }
}
