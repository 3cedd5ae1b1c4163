use log::debug;

use crate::models::holding::Holding;
use crate::models::recommendation::{RecommendationThresholds, Recommendations};

/// Sectors a diversified equity portfolio would usually touch.
pub const STANDARD_SECTORS: [&str; 11] = [
    "Technology",
    "Healthcare",
    "Financials",
    "Consumer Discretionary",
    "Communication Services",
    "Industrials",
    "Consumer Staples",
    "Energy",
    "Utilities",
    "Real Estate",
    "Materials",
];

const GENERAL_ADVICE: &str = "Based on your portfolio composition, regular quarterly reviews help \
keep it aligned with your financial goals. Consider setting up price alerts for your holdings to \
stay informed about significant movements without constant monitoring. Additionally, maintaining \
a cash reserve of 5-10% would provide flexibility to capitalize on future opportunities.";

/// Rule-based advice over a holdings snapshot. Remembers the last set it
/// generated so repeated views don't recompute.
pub struct RecommendationService {
    thresholds: RecommendationThresholds,
    last: Option<Recommendations>,
}

impl RecommendationService {
    pub fn new(thresholds: RecommendationThresholds) -> Self {
        Self {
            thresholds,
            last: None,
        }
    }

    /// The cached set, unless `force_refresh` or nothing was generated yet.
    pub fn get(&mut self, holdings: &[Holding], force_refresh: bool) -> Recommendations {
        match &self.last {
            Some(cached) if !force_refresh => cached.clone(),
            _ => self.generate(holdings),
        }
    }

    pub fn last(&self) -> Option<&Recommendations> {
        self.last.as_ref()
    }

    /// Evaluate every rule against `holdings` and remember the result.
    pub fn generate(&mut self, holdings: &[Holding]) -> Recommendations {
        let recommendations = if holdings.is_empty() {
            Self::fallback()
        } else {
            Recommendations {
                diversification: self.diversification(holdings),
                risk: self.risk(holdings),
                rebalancing: self.rebalancing(holdings),
                tax_loss: self.tax_loss(holdings),
                general: GENERAL_ADVICE.to_string(),
            }
        };
        debug!("Generated recommendations for {} holdings", holdings.len());
        self.last = Some(recommendations.clone());
        recommendations
    }

    /// Generic advice used when there is nothing to analyse.
    pub fn fallback() -> Recommendations {
        Recommendations {
            diversification: "Consider diversifying your portfolio across more sectors to reduce risk."
                .into(),
            risk: "Your portfolio contains a mix of stable and volatile stocks. Consider your risk \
                   tolerance when adding new positions."
                .into(),
            rebalancing: "Regular rebalancing helps maintain your target asset allocation. \
                          Consider reviewing quarterly."
                .into(),
            tax_loss: "Look for opportunities to harvest tax losses near the end of the tax year."
                .into(),
            general: "Dollar-cost averaging can help reduce the impact of market volatility on \
                      your portfolio."
                .into(),
        }
    }

    fn diversification(&self, holdings: &[Holding]) -> String {
        let mut sectors: Vec<(&str, f64)> = Vec::new();
        let mut total_value = 0.0;
        for holding in holdings {
            let value = holding.market_value();
            total_value += value;
            match sectors.iter_mut().find(|(s, _)| *s == holding.sector) {
                Some((_, v)) => *v += value,
                None => sectors.push((holding.sector.as_str(), value)),
            }
        }

        let limit = self.thresholds.concentration_pct;
        let concentrated: Vec<(&str, f64)> = if total_value > 0.0 {
            sectors
                .iter()
                .map(|(s, v)| (*s, v / total_value * 100.0))
                .filter(|(_, pct)| *pct > limit)
                .collect()
        } else {
            Vec::new()
        };

        if concentrated.is_empty() {
            return format!(
                "Your portfolio demonstrates good diversification across sectors, with no single \
                 sector exceeding {limit}%. This balanced approach helps mitigate sector-specific \
                 risks. Continue monitoring to maintain this healthy distribution."
            );
        }

        let names: Vec<&str> = concentrated.iter().map(|(s, _)| *s).collect();
        let shares: Vec<String> = concentrated
            .iter()
            .map(|(_, pct)| format!("{}%", pct.round()))
            .collect();
        let missing: Vec<&str> = STANDARD_SECTORS
            .iter()
            .copied()
            .filter(|name| !sectors.iter().any(|(s, _)| s == name))
            .take(3)
            .collect();

        let mut text = format!(
            "Your portfolio shows high concentration in the {} {}, representing {} of your portfolio.",
            names.join(", "),
            if names.len() > 1 { "sectors" } else { "sector" },
            shares.join(", ")
        );
        if !missing.is_empty() {
            text.push_str(&format!(
                " Consider diversifying into other sectors like {} to reduce risk.",
                missing.join(", ")
            ));
        }
        text
    }

    fn risk(&self, holdings: &[Holding]) -> String {
        let volatile: Vec<&Holding> = holdings
            .iter()
            .filter(|h| match (h.low_52_week, h.high_52_week) {
                // A zero low under a positive high divides to infinity.
                (Some(low), Some(high)) => high / low > self.thresholds.volatility_ratio,
                _ => false,
            })
            .collect();

        if (volatile.len() as f64) <= holdings.len() as f64 * self.thresholds.volatile_share {
            return "Your portfolio's overall volatility appears balanced, with most holdings \
                    showing moderate price stability. This suggests a reasonable risk profile. \
                    Consider setting up stop-loss orders for any particularly volatile positions \
                    to protect against sudden market downturns."
                .to_string();
        }

        let share = (volatile.len() as f64 / holdings.len() as f64 * 100.0).round();
        let tickers: Vec<&str> = volatile.iter().take(3).map(|h| h.ticker.as_str()).collect();
        format!(
            "Your portfolio contains {} volatile stocks ({share}% of holdings) including {}{}. \
             These stocks have shown significant price swings over the past year. Consider \
             balancing with more stable investments to reduce overall portfolio volatility.",
            volatile.len(),
            tickers.join(", "),
            if volatile.len() > 3 { ", and others" } else { "" }
        )
    }

    fn rebalancing(&self, holdings: &[Holding]) -> String {
        let pct = self.thresholds.price_move_pct;
        let gainers = self.gainers(holdings);
        let losers = self.losers(holdings);

        match (gainers.is_empty(), losers.is_empty()) {
            (false, losers_empty) => {
                let mut text = format!(
                    "Consider taking partial profits on {}, which have gained over {pct}% from \
                     your purchase price. Rebalancing these positions would lock in gains and \
                     reduce exposure to potential corrections.",
                    gainers.join(", ")
                );
                if !losers_empty {
                    text.push_str(&format!(
                        " You might consider reallocating some of these gains to average down on \
                         underperforming positions like {}, if you still believe in their \
                         long-term potential.",
                        losers.join(", ")
                    ));
                }
                text
            }
            (true, false) => format!(
                "Several positions including {} are down over {pct}% from your purchase price. \
                 Consider reevaluating these holdings based on their current fundamentals to \
                 determine whether averaging down or cutting losses would be more appropriate.",
                losers.join(", ")
            ),
            (true, true) => format!(
                "Your portfolio appears well-balanced with most positions within {pct}% of their \
                 purchase prices. Continue monitoring position sizes to ensure they align with \
                 your investment goals and risk tolerance."
            ),
        }
    }

    fn tax_loss(&self, holdings: &[Holding]) -> String {
        let losers = self.losers(holdings);
        if losers.is_empty() {
            return "No significant tax loss harvesting opportunities identified at this time. \
                    Most positions are either at a gain or minor loss, making tax-loss selling \
                    less beneficial. Continue monitoring for opportunities as market conditions \
                    change."
                .to_string();
        }
        format!(
            "Potential tax loss harvesting candidates include {}, which are down more than {}%. \
             Consider selling these positions to offset capital gains, potentially reducing your \
             tax liability. Remember the wash-sale rule if you plan to rebuy within 30 days.",
            losers.join(", "),
            self.thresholds.price_move_pct
        )
    }

    fn gainers<'a>(&self, holdings: &'a [Holding]) -> Vec<&'a str> {
        let factor = 1.0 + self.thresholds.price_move_pct / 100.0;
        holdings
            .iter()
            .filter(|h| h.current_price > h.avg_cost * factor)
            .map(|h| h.ticker.as_str())
            .collect()
    }

    fn losers<'a>(&self, holdings: &'a [Holding]) -> Vec<&'a str> {
        let factor = 1.0 - self.thresholds.price_move_pct / 100.0;
        holdings
            .iter()
            .filter(|h| h.current_price < h.avg_cost * factor)
            .map(|h| h.ticker.as_str())
            .collect()
    }
}

impl Default for RecommendationService {
    fn default() -> Self {
        Self::new(RecommendationThresholds::default())
    }
}
