// ═══════════════════════════════════════════════════════════════════
// Service Tests: PortfolioService, AnalyticsService, PriceService,
// DividendService, RecommendationService, ChartService
// ═══════════════════════════════════════════════════════════════════

use async_trait::async_trait;
use chrono::{NaiveDate, TimeZone, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use uuid::Uuid;

use stock_portfolio_core::errors::CoreError;
use stock_portfolio_core::models::analytics::PerformanceMetric;
use stock_portfolio_core::models::chart::ChartKind;
use stock_portfolio_core::models::dividend::{Dividend, DividendFrequency, NewDividend};
use stock_portfolio_core::models::holding::{Holding, NewHolding};
use stock_portfolio_core::models::portfolio::Portfolio;
use stock_portfolio_core::models::quote::{Quote, SymbolMatch, WeekRange};
use stock_portfolio_core::models::recommendation::RecommendationThresholds;
use stock_portfolio_core::models::settings::MarketDataConfig;
use stock_portfolio_core::models::transaction::{Trade, TransactionType};
use stock_portfolio_core::providers::registry::QuoteProviderRegistry;
use stock_portfolio_core::providers::traits::QuoteProvider;
use stock_portfolio_core::services::analytics_service::AnalyticsService;
use stock_portfolio_core::services::chart_service::ChartService;
use stock_portfolio_core::services::dividend_service::DividendService;
use stock_portfolio_core::services::portfolio_service::PortfolioService;
use stock_portfolio_core::services::price_service::PriceService;
use stock_portfolio_core::services::recommendation_service::RecommendationService;

const EPS: f64 = 1e-9;

fn approx(a: f64, b: f64) -> bool {
    (a - b).abs() < EPS
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn holding(ticker: &str, sector: &str, units: f64, avg_cost: f64, current_price: f64) -> Holding {
    Holding {
        id: Uuid::new_v4(),
        name: format!("{ticker} Inc."),
        ticker: ticker.into(),
        units,
        avg_cost,
        current_price,
        sector: sector.into(),
        low_52_week: None,
        high_52_week: None,
        notes: String::new(),
        date_added: Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
    }
}

fn portfolio_of(holdings: Vec<Holding>) -> Portfolio {
    Portfolio::new(holdings, Vec::new())
}

// ═══════════════════════════════════════════════════════════════════
// Mock Provider
// ═══════════════════════════════════════════════════════════════════

struct MockQuoteProvider {
    prices: HashMap<String, f64>,
    failing: HashSet<String>,
    quote_calls: AtomicUsize,
    range_calls: AtomicUsize,
}

impl MockQuoteProvider {
    fn new(prices: &[(&str, f64)]) -> Self {
        Self {
            prices: prices.iter().map(|(s, p)| (s.to_string(), *p)).collect(),
            failing: HashSet::new(),
            quote_calls: AtomicUsize::new(0),
            range_calls: AtomicUsize::new(0),
        }
    }

    fn failing_on(mut self, symbol: &str) -> Self {
        self.failing.insert(symbol.to_string());
        self
    }
}

#[async_trait]
impl QuoteProvider for MockQuoteProvider {
    fn name(&self) -> &str {
        "MockProvider"
    }

    async fn get_quote(&self, symbol: &str) -> Result<Quote, CoreError> {
        self.quote_calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.contains(symbol) {
            return Err(CoreError::Upstream {
                provider: "MockProvider".into(),
                message: format!("No quote data for {symbol}"),
            });
        }
        let price = *self.prices.get(symbol).ok_or_else(|| CoreError::Upstream {
            provider: "MockProvider".into(),
            message: format!("Unknown symbol {symbol}"),
        })?;
        Ok(Quote {
            symbol: symbol.to_string(),
            price,
            change: 1.0,
            change_percent: 0.5,
            high: price + 1.0,
            low: price - 1.0,
            volume: 1000,
            as_of_date: Some(date(2025, 1, 15)),
        })
    }

    async fn get_52_week_range(&self, symbol: &str, _today: NaiveDate) -> Result<WeekRange, CoreError> {
        self.range_calls.fetch_add(1, Ordering::SeqCst);
        Ok(WeekRange {
            symbol: symbol.to_string(),
            high_52_week: 200.0,
            low_52_week: 100.0,
        })
    }

    async fn search_symbols(&self, keywords: &str) -> Result<Vec<SymbolMatch>, CoreError> {
        Ok(vec![SymbolMatch {
            symbol: keywords.to_uppercase(),
            name: "Match".into(),
            asset_type: "Equity".into(),
            region: "United States".into(),
            currency: "USD".into(),
        }])
    }
}

/// Forwards to a shared mock so the test keeps a handle on its call counters.
struct SharedProvider(Arc<MockQuoteProvider>);

#[async_trait]
impl QuoteProvider for SharedProvider {
    fn name(&self) -> &str {
        self.0.name()
    }

    async fn get_quote(&self, symbol: &str) -> Result<Quote, CoreError> {
        self.0.get_quote(symbol).await
    }

    async fn get_52_week_range(&self, symbol: &str, today: NaiveDate) -> Result<WeekRange, CoreError> {
        self.0.get_52_week_range(symbol, today).await
    }

    async fn search_symbols(&self, keywords: &str) -> Result<Vec<SymbolMatch>, CoreError> {
        self.0.search_symbols(keywords).await
    }
}

fn fast_config() -> MarketDataConfig {
    MarketDataConfig {
        batch_delay_ms: 0,
        ..Default::default()
    }
}

fn price_service(mock: Arc<MockQuoteProvider>, config: MarketDataConfig) -> PriceService {
    let mut registry = QuoteProviderRegistry::new();
    registry.register(Box::new(SharedProvider(mock)));
    PriceService::new(registry, config)
}

// ═══════════════════════════════════════════════════════════════════
// PortfolioService
// ═══════════════════════════════════════════════════════════════════

mod portfolio_service {
    use super::*;

    fn now() -> chrono::DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn add_holding_normalises_and_records_buy() {
        let service = PortfolioService::new();
        let mut portfolio = Portfolio::default();

        let (h, tx) = service
            .add_holding(
                &mut portfolio,
                NewHolding::new("Apple Inc.", " aapl ", 100.0, 150.0, 175.0),
                now(),
            )
            .unwrap();

        assert_eq!(h.ticker, "AAPL");
        assert_eq!(h.sector, "Other");
        assert_eq!(h.avg_cost, 150.0);
        assert_eq!(h.date_added, now());
        assert_eq!(portfolio.holdings.len(), 1);

        assert_eq!(tx.transaction_type, TransactionType::Buy);
        assert_eq!(tx.stock_id, h.id);
        assert_eq!(tx.units, 100.0);
        assert_eq!(tx.price, 150.0);
        assert_eq!(tx.date, date(2025, 3, 1));
        assert_eq!(tx.notes, "Initial purchase");
        assert_eq!(portfolio.transactions, vec![tx]);
    }

    #[test]
    fn add_holding_uses_purchase_date_and_notes() {
        let service = PortfolioService::new();
        let mut portfolio = Portfolio::default();
        let new = NewHolding::new("Exxon", "XOM", 5.0, 100.0, 110.0)
            .with_sector("Energy")
            .with_notes("dividend play")
            .on(date(2024, 12, 1));

        let (h, tx) = service.add_holding(&mut portfolio, new, now()).unwrap();
        assert_eq!(h.sector, "Energy");
        assert_eq!(h.notes, "dividend play");
        assert_eq!(tx.date, date(2024, 12, 1));
        assert_eq!(tx.notes, "dividend play");
    }

    #[test]
    fn add_holding_rejects_invalid_numbers_without_side_effects() {
        let service = PortfolioService::new();
        let mut portfolio = Portfolio::default();

        for new in [
            NewHolding::new("Bad", "BAD", 0.0, 10.0, 10.0),
            NewHolding::new("Bad", "BAD", 1.0, f64::NAN, 10.0),
            NewHolding::new("Bad", "BAD", 1.0, 10.0, f64::INFINITY),
        ] {
            let result = service.add_holding(&mut portfolio, new, now());
            assert!(matches!(result, Err(CoreError::ValidationError(_))));
        }
        assert!(portfolio.is_empty());
    }

    #[test]
    fn buy_more_recomputes_weighted_average() {
        let service = PortfolioService::new();
        let h = holding("AAPL", "Technology", 100.0, 150.0, 175.0);
        let id = h.id;
        let mut portfolio = portfolio_of(vec![h]);

        let (updated, tx) = service
            .buy_more(&mut portfolio, id, &Trade::new(50.0, 180.0, date(2025, 2, 1)))
            .unwrap();

        assert!(approx(updated.avg_cost, 160.0));
        assert_eq!(updated.units, 150.0);
        assert_eq!(tx.transaction_type, TransactionType::Buy);
        assert_eq!(tx.units, 50.0);
        assert_eq!(tx.price, 180.0);
        assert_eq!(portfolio.holdings[0], updated);
    }

    #[test]
    fn repeated_buys_average_over_every_purchase() {
        let service = PortfolioService::new();
        let h = holding("ACME", "Industrials", 10.0, 8.0, 9.0);
        let id = h.id;
        let mut portfolio = portfolio_of(vec![h]);

        let buys = [(5.0, 11.0), (2.5, 7.0), (12.5, 10.0)];
        for (units, price) in buys {
            service
                .buy_more(&mut portfolio, id, &Trade::new(units, price, date(2025, 2, 1)))
                .unwrap();
        }

        let purchases = std::iter::once((10.0, 8.0)).chain(buys);
        let (units, cost) = purchases.fold((0.0, 0.0), |(u, c), (units, price)| {
            (u + units, c + units * price)
        });
        let updated = &portfolio.holdings[0];
        assert!((updated.avg_cost - cost / units).abs() < 1e-9);
        assert!((updated.avg_cost - 9.2).abs() < 1e-9);
        assert_eq!(updated.units, 30.0);
        assert_eq!(portfolio.transactions.len(), 3);
    }

    #[test]
    fn buy_more_rejects_non_positive_units() {
        let service = PortfolioService::new();
        let h = holding("AAPL", "Technology", 100.0, 150.0, 175.0);
        let id = h.id;
        let mut portfolio = portfolio_of(vec![h.clone()]);

        let result = service.buy_more(&mut portfolio, id, &Trade::new(0.0, 180.0, date(2025, 2, 1)));
        assert!(matches!(result, Err(CoreError::ValidationError(_))));
        assert_eq!(portfolio.holdings, vec![h]);
        assert!(portfolio.transactions.is_empty());
    }

    #[test]
    fn buy_more_unknown_holding() {
        let service = PortfolioService::new();
        let mut portfolio = Portfolio::default();
        let result = service.buy_more(
            &mut portfolio,
            Uuid::new_v4(),
            &Trade::new(1.0, 1.0, date(2025, 2, 1)),
        );
        assert!(matches!(result, Err(CoreError::HoldingNotFound(_))));
    }

    #[test]
    fn partial_sell_realizes_gain_and_keeps_avg_cost() {
        let service = PortfolioService::new();
        let h = holding("AAPL", "Technology", 100.0, 150.0, 175.0);
        let id = h.id;
        let mut portfolio = portfolio_of(vec![h]);

        let outcome = service
            .sell(&mut portfolio, id, &Trade::new(40.0, 175.0, date(2025, 2, 1)))
            .unwrap();

        assert!(!outcome.fully_sold);
        assert_eq!(outcome.transaction.gain_or_loss, Some(1000.0));
        assert_eq!(outcome.transaction.transaction_type, TransactionType::Sell);
        let remaining = outcome.holding.unwrap();
        assert_eq!(remaining.units, 60.0);
        assert_eq!(remaining.avg_cost, 150.0);
        assert_eq!(portfolio.holdings[0].units, 60.0);
    }

    #[test]
    fn full_sell_removes_holding_but_keeps_history() {
        let service = PortfolioService::new();
        let h = holding("AAPL", "Technology", 10.0, 150.0, 120.0);
        let id = h.id;
        let mut portfolio = portfolio_of(vec![h]);

        let outcome = service
            .sell(&mut portfolio, id, &Trade::new(10.0, 120.0, date(2025, 2, 1)))
            .unwrap();

        assert!(outcome.fully_sold);
        assert!(outcome.holding.is_none());
        assert_eq!(outcome.transaction.gain_or_loss, Some(-300.0));
        assert!(portfolio.holdings.is_empty());
        assert_eq!(service.get_transactions_for_holding(&portfolio, id).len(), 1);
    }

    #[test]
    fn sell_rejects_too_many_or_zero_units() {
        let service = PortfolioService::new();
        let h = holding("AAPL", "Technology", 10.0, 150.0, 120.0);
        let id = h.id;
        let mut portfolio = portfolio_of(vec![h]);

        for units in [0.0, -1.0, 10.5] {
            match service.sell(&mut portfolio, id, &Trade::new(units, 100.0, date(2025, 2, 1))) {
                Err(CoreError::ValidationError(msg)) => {
                    assert_eq!(msg, "Invalid number of units to sell")
                }
                other => panic!("Expected ValidationError, got {other:?}"),
            }
        }
        assert_eq!(portfolio.holdings[0].units, 10.0);
        assert!(portfolio.transactions.is_empty());
    }

    #[test]
    fn delete_records_no_transaction() {
        let service = PortfolioService::new();
        let h = holding("AAPL", "Technology", 10.0, 150.0, 120.0);
        let id = h.id;
        let mut portfolio = portfolio_of(vec![h]);

        let removed = service.delete_holding(&mut portfolio, id).unwrap();
        assert_eq!(removed.id, id);
        assert!(portfolio.is_empty());
        assert!(matches!(
            service.delete_holding(&mut portfolio, id),
            Err(CoreError::HoldingNotFound(_))
        ));
    }

    #[test]
    fn set_current_price_touches_one_holding() {
        let service = PortfolioService::new();
        let a = holding("AAPL", "Technology", 10.0, 150.0, 120.0);
        let b = holding("MSFT", "Technology", 5.0, 300.0, 310.0);
        let id = a.id;
        let mut portfolio = portfolio_of(vec![a, b.clone()]);

        service.set_current_price(&mut portfolio, id, 155.0).unwrap();
        assert_eq!(portfolio.holdings[0].current_price, 155.0);
        assert_eq!(portfolio.holdings[1], b);
        assert!(portfolio.transactions.is_empty());
        assert!(service.set_current_price(&mut portfolio, id, -1.0).is_err());
    }

    #[test]
    fn apply_snapshot_replaces_wholesale() {
        let service = PortfolioService::new();
        let mut portfolio = portfolio_of(vec![holding("AAPL", "Technology", 1.0, 1.0, 1.0)]);
        let snapshot = portfolio_of(vec![holding("XOM", "Energy", 2.0, 2.0, 2.0)]);

        service.apply_snapshot(&mut portfolio, snapshot.clone());
        assert_eq!(portfolio, snapshot);
    }

    #[test]
    fn transactions_are_newest_first() {
        let service = PortfolioService::new();
        let h = holding("AAPL", "Technology", 100.0, 150.0, 175.0);
        let id = h.id;
        let mut portfolio = portfolio_of(vec![h]);
        service.buy_more(&mut portfolio, id, &Trade::new(1.0, 1.0, date(2025, 1, 1))).unwrap();
        service.buy_more(&mut portfolio, id, &Trade::new(1.0, 1.0, date(2025, 3, 1))).unwrap();
        service.sell(&mut portfolio, id, &Trade::new(1.0, 1.0, date(2025, 2, 1))).unwrap();

        let dates: Vec<NaiveDate> = service
            .get_transactions(&portfolio)
            .iter()
            .map(|t| t.date)
            .collect();
        assert_eq!(dates, vec![date(2025, 3, 1), date(2025, 2, 1), date(2025, 1, 1)]);
    }
}

// ═══════════════════════════════════════════════════════════════════
// AnalyticsService
// ═══════════════════════════════════════════════════════════════════

mod analytics_service {
    use super::*;

    #[test]
    fn empty_portfolio_metrics_are_zero() {
        let metrics = AnalyticsService::new().metrics(&Portfolio::default());
        assert_eq!(metrics.total_value, 0.0);
        assert_eq!(metrics.total_cost, 0.0);
        assert_eq!(metrics.total_gain_loss, 0.0);
        assert_eq!(metrics.total_gain_loss_percent, 0.0);
        assert_eq!(metrics.holdings_count, 0);
    }

    #[test]
    fn metrics_totals_and_counts() {
        let portfolio = portfolio_of(vec![
            holding("AAPL", "Technology", 10.0, 100.0, 120.0),
            holding("XOM", "Energy", 10.0, 100.0, 90.0),
            holding("KO", "Consumer Staples", 10.0, 50.0, 50.0),
        ]);
        let metrics = AnalyticsService::new().metrics(&portfolio);

        assert_eq!(metrics.total_value, 2600.0);
        assert_eq!(metrics.total_cost, 2500.0);
        assert!(approx(metrics.total_gain_loss, metrics.total_value - metrics.total_cost));
        assert!(approx(metrics.total_gain_loss_percent, 4.0));
        assert_eq!(metrics.gainers_count, 1);
        assert_eq!(metrics.losers_count, 1);
        assert_eq!(metrics.holdings_count, 3);
    }

    #[test]
    fn sector_allocation_shares() {
        let portfolio = portfolio_of(vec![
            holding("XOM", "Energy", 3.0, 100.0, 100.0),
            holding("AAPL", "Tech", 7.0, 100.0, 100.0),
        ]);
        let allocation = AnalyticsService::new().sector_allocation(&portfolio);

        assert_eq!(allocation.len(), 2);
        assert_eq!(allocation[0].sector, "Tech");
        assert_eq!(allocation[0].value, 700.0);
        assert!(approx(allocation[0].percentage, 70.0));
        assert_eq!(allocation[1].sector, "Energy");
        assert!(approx(allocation[1].percentage, 30.0));
    }

    #[test]
    fn sector_labels_are_case_sensitive() {
        let portfolio = portfolio_of(vec![
            holding("A", "Tech", 1.0, 1.0, 1.0),
            holding("B", "tech", 1.0, 1.0, 1.0),
        ]);
        assert_eq!(AnalyticsService::new().sector_allocation(&portfolio).len(), 2);
    }

    #[test]
    fn zero_value_allocation_has_zero_percent() {
        let portfolio = portfolio_of(vec![holding("A", "Tech", 1.0, 1.0, 0.0)]);
        let allocation = AnalyticsService::new().sector_allocation(&portfolio);
        assert_eq!(allocation[0].percentage, 0.0);
    }

    #[test]
    fn top_performers_by_metric() {
        let portfolio = portfolio_of(vec![
            holding("SMALL", "Tech", 1.0, 10.0, 20.0),   // +100%, +10
            holding("BIG", "Tech", 100.0, 100.0, 150.0), // +50%, +5000
            holding("DOWN", "Tech", 10.0, 100.0, 80.0),  // -20%, -200
        ]);
        let service = AnalyticsService::new();

        let by_pct = service.top_performers(&portfolio, PerformanceMetric::Percentage);
        assert_eq!(by_pct.best.unwrap().ticker, "SMALL");
        assert_eq!(by_pct.worst.unwrap().ticker, "DOWN");

        let by_value = service.top_performers(&portfolio, PerformanceMetric::Value);
        assert_eq!(by_value.best.unwrap().ticker, "BIG");
    }

    #[test]
    fn top_performers_ties_go_to_first_holding() {
        let portfolio = portfolio_of(vec![
            holding("AAA", "Tech", 1.0, 100.0, 110.0),
            holding("BBB", "Tech", 1.0, 100.0, 110.0),
            holding("CCC", "Tech", 1.0, 100.0, 95.0),
            holding("DDD", "Tech", 1.0, 100.0, 95.0),
        ]);
        let service = AnalyticsService::new();

        for metric in [PerformanceMetric::Percentage, PerformanceMetric::Value] {
            let top = service.top_performers(&portfolio, metric);
            assert_eq!(top.best.unwrap().ticker, "AAA");
            assert_eq!(top.worst.unwrap().ticker, "CCC");
        }
    }

    #[test]
    fn top_performers_empty() {
        let top = AnalyticsService::new().top_performers(&Portfolio::default(), PerformanceMetric::Percentage);
        assert!(top.best.is_none());
        assert!(top.worst.is_none());
    }

    #[test]
    fn gain_loss_split_realized_and_unrealized() {
        let service = PortfolioService::new();
        let up = holding("UP", "Tech", 10.0, 100.0, 110.0);
        let down = holding("DOWN", "Tech", 10.0, 100.0, 70.0);
        let (up_id, down_id) = (up.id, down.id);
        let mut portfolio = portfolio_of(vec![up, down]);
        service.sell(&mut portfolio, up_id, &Trade::new(5.0, 120.0, date(2025, 1, 1))).unwrap();
        service.sell(&mut portfolio, down_id, &Trade::new(5.0, 60.0, date(2025, 1, 1))).unwrap();

        let split = AnalyticsService::new().gain_loss_split(&portfolio);
        assert!(approx(split.unrealized_gain, 50.0));
        assert!(approx(split.unrealized_loss, 150.0));
        assert!(approx(split.realized_gain, 100.0));
        assert!(approx(split.realized_loss, 200.0));
        assert!(approx(split.total_unrealized, -100.0));
        assert!(approx(split.total_realized, -100.0));
    }

    #[test]
    fn recovery_potential_sorted_by_breakeven() {
        let portfolio = portfolio_of(vec![
            holding("HALF", "Tech", 1.0, 100.0, 50.0),
            holding("UP", "Tech", 1.0, 100.0, 150.0),
            holding("TENTH", "Tech", 1.0, 100.0, 90.0),
        ]);
        let recovery = AnalyticsService::new().recovery_potential(&portfolio);

        assert_eq!(recovery.len(), 2);
        assert_eq!(recovery[0].ticker, "HALF");
        assert!(approx(recovery[0].percent_down, 50.0));
        assert!(approx(recovery[0].percent_to_breakeven, 100.0));
        assert_eq!(recovery[1].ticker, "TENTH");
    }

    #[test]
    fn sector_performance_returns_and_allocation() {
        let portfolio = portfolio_of(vec![
            holding("A", "Tech", 10.0, 100.0, 120.0),
            holding("B", "Tech", 10.0, 100.0, 100.0),
            holding("C", "Energy", 10.0, 100.0, 80.0),
        ]);
        let sectors = AnalyticsService::new().sector_performance(&portfolio);

        assert_eq!(sectors[0].sector, "Tech");
        assert_eq!(sectors[0].total_value, 2200.0);
        assert_eq!(sectors[0].total_cost, 2000.0);
        assert!(approx(sectors[0].performance, 10.0));
        assert!(approx(sectors[0].allocation, 2200.0 / 3000.0 * 100.0));
        assert!(approx(sectors[1].performance, -20.0));
    }
}

// ═══════════════════════════════════════════════════════════════════
// PriceService
// ═══════════════════════════════════════════════════════════════════

mod price_service {
    use super::*;

    #[tokio::test]
    async fn quotes_are_cached_within_ttl() {
        let mock = Arc::new(MockQuoteProvider::new(&[("AAPL", 180.0)]));
        let service = price_service(mock.clone(), fast_config());

        let first = service.get_quote("AAPL").await.unwrap();
        let second = service.get_quote("aapl").await.unwrap();
        assert_eq!(first, second);
        assert_eq!(mock.quote_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn clear_cache_forces_refetch() {
        let mock = Arc::new(MockQuoteProvider::new(&[("AAPL", 180.0)]));
        let service = price_service(mock.clone(), fast_config());

        service.get_quote("AAPL").await.unwrap();
        service.get_52_week_range("AAPL", date(2025, 3, 1)).await.unwrap();
        service.clear_cache().await;
        service.get_quote("AAPL").await.unwrap();
        service.get_52_week_range("AAPL", date(2025, 3, 1)).await.unwrap();

        assert_eq!(mock.quote_calls.load(Ordering::SeqCst), 2);
        assert_eq!(mock.range_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn zero_ttl_always_refetches() {
        let mock = Arc::new(MockQuoteProvider::new(&[("AAPL", 180.0)]));
        let config = MarketDataConfig {
            cache_ttl_secs: 0,
            ..fast_config()
        };
        let service = price_service(mock.clone(), config);

        service.get_quote("AAPL").await.unwrap();
        service.get_quote("AAPL").await.unwrap();
        assert_eq!(mock.quote_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn ranges_have_their_own_cache() {
        let mock = Arc::new(MockQuoteProvider::new(&[("AAPL", 180.0)]));
        let service = price_service(mock.clone(), fast_config());

        service.get_quote("AAPL").await.unwrap();
        let range = service.get_52_week_range("AAPL", date(2025, 1, 15)).await.unwrap();
        service.get_52_week_range("AAPL", date(2025, 1, 15)).await.unwrap();

        assert_eq!(range.high_52_week, 200.0);
        assert_eq!(mock.range_calls.load(Ordering::SeqCst), 1);
        assert_eq!(mock.quote_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn no_provider_error() {
        let service = PriceService::new(QuoteProviderRegistry::new(), fast_config());
        assert!(!service.has_provider());
        assert!(matches!(
            service.get_quote("AAPL").await,
            Err(CoreError::NoProvider(_))
        ));
    }

    #[tokio::test]
    async fn falls_back_to_next_provider() {
        let broken = Arc::new(MockQuoteProvider::new(&[]).failing_on("AAPL"));
        let working = Arc::new(MockQuoteProvider::new(&[("AAPL", 181.0)]));
        let mut registry = QuoteProviderRegistry::new();
        registry.register(Box::new(SharedProvider(broken.clone())));
        registry.register(Box::new(SharedProvider(working.clone())));
        let service = PriceService::new(registry, fast_config());

        let quote = service.get_quote("AAPL").await.unwrap();
        assert_eq!(quote.price, 181.0);
        assert_eq!(broken.quote_calls.load(Ordering::SeqCst), 1);
        assert_eq!(working.quote_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn all_providers_failing_returns_last_error() {
        let mock = Arc::new(MockQuoteProvider::new(&[]).failing_on("AAPL"));
        let service = price_service(mock, fast_config());
        match service.get_quote("AAPL").await {
            Err(CoreError::Upstream { message, .. }) => assert!(message.contains("AAPL")),
            other => panic!("Expected Upstream, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn update_prices_omits_failures() {
        let mock = Arc::new(
            MockQuoteProvider::new(&[("AAPL", 190.0), ("MSFT", 410.0)]).failing_on("BAD"),
        );
        let service = price_service(mock, fast_config());
        let holdings = vec![
            holding("AAPL", "Tech", 1.0, 1.0, 1.0),
            holding("BAD", "Tech", 1.0, 1.0, 1.0),
            holding("MSFT", "Tech", 1.0, 1.0, 1.0),
        ];

        let updates = service.update_prices(&holdings).await;
        assert_eq!(updates.len(), 2);
        assert_eq!(updates[0].id, holdings[0].id);
        assert_eq!(updates[0].current_price, 190.0);
        assert_eq!(updates[1].id, holdings[2].id);
        assert_eq!(updates[1].current_price, 410.0);
    }

    #[tokio::test]
    async fn update_prices_covers_every_batch() {
        let tickers: Vec<String> = (0..12).map(|i| format!("T{i}")).collect();
        let prices: Vec<(&str, f64)> = tickers.iter().map(|t| (t.as_str(), 10.0)).collect();
        let mock = Arc::new(MockQuoteProvider::new(&prices));
        let config = MarketDataConfig {
            batch_size: 5,
            ..fast_config()
        };
        let service = price_service(mock.clone(), config);
        let holdings: Vec<Holding> = tickers
            .iter()
            .map(|t| holding(t, "Tech", 1.0, 1.0, 1.0))
            .collect();

        let updates = service.update_prices(&holdings).await;
        assert_eq!(updates.len(), 12);
        assert_eq!(mock.quote_calls.load(Ordering::SeqCst), 12);
    }

    #[tokio::test(start_paused = true)]
    async fn update_prices_waits_between_batches_only() {
        let mock = Arc::new(MockQuoteProvider::new(&[("A", 1.0), ("B", 2.0), ("C", 3.0)]));
        let config = MarketDataConfig {
            batch_size: 2,
            batch_delay_ms: 1000,
            ..Default::default()
        };
        let service = price_service(mock, config);
        let holdings = vec![
            holding("A", "Tech", 1.0, 1.0, 1.0),
            holding("B", "Tech", 1.0, 1.0, 1.0),
            holding("C", "Tech", 1.0, 1.0, 1.0),
        ];

        let started = tokio::time::Instant::now();
        let updates = service.update_prices(&holdings).await;
        let elapsed = started.elapsed();

        assert_eq!(updates.len(), 3);
        // two batches → exactly one pause
        assert!(elapsed >= std::time::Duration::from_millis(1000));
        assert!(elapsed < std::time::Duration::from_millis(2000));
    }

    #[tokio::test]
    async fn update_prices_reuses_cached_quotes() {
        let mock = Arc::new(MockQuoteProvider::new(&[("AAPL", 190.0)]));
        let service = price_service(mock.clone(), fast_config());
        let holdings = vec![holding("AAPL", "Tech", 1.0, 1.0, 1.0)];

        service.update_prices(&holdings).await;
        service.update_prices(&holdings).await;
        assert_eq!(mock.quote_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn search_passes_through() {
        let mock = Arc::new(MockQuoteProvider::new(&[]));
        let service = price_service(mock, fast_config());
        let matches = service.search_symbols("tsla").await.unwrap();
        assert_eq!(matches[0].symbol, "TSLA");
    }
}

// ═══════════════════════════════════════════════════════════════════
// DividendService
// ═══════════════════════════════════════════════════════════════════

mod dividend_service {
    use super::*;

    fn new_dividend(ticker: &str, ex: NaiveDate, pay: NaiveDate, per_share: f64, units: f64) -> NewDividend {
        NewDividend {
            stock_id: None,
            ticker: ticker.into(),
            stock_name: format!("{ticker} Inc."),
            ex_date: ex,
            payment_date: pay,
            amount_per_share: per_share,
            units,
            frequency: DividendFrequency::Quarterly,
            reinvested: false,
            notes: String::new(),
        }
    }

    fn dividend(ticker: &str, ex: NaiveDate, pay: NaiveDate, per_share: f64, units: f64) -> Dividend {
        DividendService::new()
            .create(new_dividend(ticker, ex, pay, per_share, units))
            .unwrap()
    }

    #[test]
    fn create_computes_total() {
        let d = dividend("ko", date(2025, 3, 10), date(2025, 3, 25), 0.46, 100.0);
        assert_eq!(d.ticker, "KO");
        assert!(approx(d.total_amount, 46.0));
    }

    #[test]
    fn create_rejects_payment_before_ex_date() {
        let result = DividendService::new().create(new_dividend(
            "KO",
            date(2025, 3, 10),
            date(2025, 3, 1),
            0.46,
            100.0,
        ));
        assert!(matches!(result, Err(CoreError::ValidationError(_))));
    }

    #[test]
    fn create_rejects_negative_amount() {
        let result = DividendService::new().create(new_dividend(
            "KO",
            date(2025, 3, 10),
            date(2025, 3, 25),
            -0.46,
            100.0,
        ));
        assert!(result.is_err());
    }

    #[test]
    fn upcoming_window_is_inclusive_and_sorted() {
        let today = date(2025, 3, 1);
        let dividends = vec![
            dividend("LATE", date(2025, 3, 31), date(2025, 4, 10), 1.0, 1.0),
            dividend("PAST", date(2025, 2, 28), date(2025, 3, 10), 1.0, 1.0),
            dividend("TODAY", date(2025, 3, 1), date(2025, 3, 15), 1.0, 1.0),
            dividend("FAR", date(2025, 4, 1), date(2025, 4, 15), 1.0, 1.0),
        ];
        let upcoming = DividendService::new().upcoming(&dividends, today, 30);
        let tickers: Vec<&str> = upcoming.iter().map(|d| d.ticker.as_str()).collect();
        assert_eq!(tickers, vec!["TODAY", "LATE"]);
    }

    #[test]
    fn huge_upcoming_window_does_not_overflow() {
        let today = date(2025, 3, 1);
        let dividends = vec![dividend("KO", date(2030, 1, 1), date(2030, 1, 15), 1.0, 1.0)];
        let service = DividendService::new();
        assert_eq!(service.upcoming(&dividends, today, i64::MAX).len(), 1);
        assert_eq!(service.upcoming(&dividends, today, 10_000_000_000).len(), 1);
    }

    #[test]
    fn annual_income_uses_latest_per_ticker() {
        let mut monthly = dividend("O", date(2025, 1, 1), date(2025, 1, 15), 0.25, 100.0);
        monthly.frequency = DividendFrequency::Monthly;
        let dividends = vec![
            dividend("KO", date(2024, 12, 1), date(2024, 12, 15), 0.40, 100.0),
            dividend("KO", date(2025, 3, 1), date(2025, 3, 15), 0.50, 100.0),
            monthly,
        ];
        let service = DividendService::new();
        // KO: 50 × 4, O: 25 × 12
        assert!(approx(service.annual_income(&dividends), 500.0));

        let summary = service.summary(&dividends, 10_000.0);
        assert!(approx(summary.portfolio_yield, 5.0));
        assert!(approx(summary.monthly_average, 500.0 / 12.0));
    }

    #[test]
    fn yield_is_zero_for_empty_portfolio() {
        let dividends = vec![dividend("KO", date(2025, 3, 1), date(2025, 3, 15), 0.5, 100.0)];
        assert_eq!(DividendService::new().portfolio_yield(&dividends, 0.0), 0.0);
    }

    #[test]
    fn monthly_history_splits_reinvested() {
        let mut reinvested = dividend("MSFT", date(2025, 1, 5), date(2025, 1, 20), 1.0, 10.0);
        reinvested.reinvested = true;
        let dividends = vec![
            dividend("KO", date(2025, 2, 1), date(2025, 2, 14), 0.5, 100.0),
            reinvested,
            dividend("PG", date(2025, 1, 2), date(2025, 1, 25), 1.0, 20.0),
            dividend("FUTURE", date(2025, 3, 1), date(2025, 3, 30), 1.0, 1.0),
        ];
        let history = DividendService::new().monthly_history(&dividends, date(2025, 3, 1));

        assert_eq!(history.len(), 2);
        assert_eq!(history[0].month, "2025-01");
        assert!(approx(history[0].total, 30.0));
        assert!(approx(history[0].reinvested, 10.0));
        assert!(approx(history[0].cash, 20.0));
        assert_eq!(history[1].month, "2025-02");
        assert!(approx(history[1].total, 50.0));
    }

    #[test]
    fn calendar_lays_out_month() {
        let dividends = vec![dividend("KO", date(2025, 3, 10), date(2025, 3, 25), 0.5, 100.0)];
        let calendar = DividendService::new().calendar(&dividends, 2025, 3).unwrap();

        // March 1st 2025 is a Saturday
        assert_eq!(calendar.first_weekday, 6);
        assert_eq!(calendar.days.len(), 31);
        assert_eq!(calendar.days[9].ex_dividends.len(), 1);
        assert_eq!(calendar.days[24].payments.len(), 1);
        assert!(calendar.days[0].ex_dividends.is_empty());
    }

    #[test]
    fn calendar_handles_leap_february() {
        let calendar = DividendService::new().calendar(&[], 2024, 2).unwrap();
        assert_eq!(calendar.days.len(), 29);
    }

    #[test]
    fn calendar_rejects_invalid_month() {
        assert!(matches!(
            DividendService::new().calendar(&[], 2025, 13),
            Err(CoreError::ValidationError(_))
        ));
    }
}

// ═══════════════════════════════════════════════════════════════════
// RecommendationService
// ═══════════════════════════════════════════════════════════════════

mod recommendation_service {
    use super::*;

    fn ranged(ticker: &str, low: f64, high: f64) -> Holding {
        let mut h = holding(ticker, "Technology", 1.0, 100.0, 100.0);
        h.low_52_week = Some(low);
        h.high_52_week = Some(high);
        h
    }

    #[test]
    fn empty_holdings_get_fallback() {
        let mut service = RecommendationService::default();
        assert_eq!(service.get(&[], false), RecommendationService::fallback());
    }

    #[test]
    fn concentration_names_sector_and_missing_sectors() {
        let holdings = vec![
            holding("AAPL", "Technology", 7.0, 100.0, 100.0),
            holding("JNJ", "Healthcare", 3.0, 100.0, 100.0),
        ];
        let recs = RecommendationService::default().generate(&holdings);

        assert!(recs.diversification.contains("Technology, Healthcare sectors"));
        assert!(recs.diversification.contains("70%, 30%"));
        assert!(recs.diversification.contains("Financials, Consumer Discretionary, Communication Services"));
    }

    #[test]
    fn balanced_sectors() {
        let holdings: Vec<Holding> = ["Technology", "Healthcare", "Energy", "Utilities", "Materials"]
            .iter()
            .map(|s| holding("X", s, 1.0, 100.0, 100.0))
            .collect();
        let recs = RecommendationService::default().generate(&holdings);
        assert!(recs.diversification.contains("good diversification"));
    }

    #[test]
    fn volatility_flags_wide_ranges() {
        let holdings = vec![
            ranged("TSLA", 100.0, 300.0),
            ranged("NVDA", 50.0, 150.0),
            ranged("KO", 55.0, 65.0),
        ];
        let recs = RecommendationService::default().generate(&holdings);
        assert!(recs.risk.contains("2 volatile stocks (67% of holdings)"));
        assert!(recs.risk.contains("TSLA, NVDA"));
    }

    #[test]
    fn zero_yearly_low_counts_as_volatile() {
        let holdings = vec![ranged("PENNY", 0.0, 4.0), ranged("FLAT", 0.0, 0.0)];
        let recs = RecommendationService::default().generate(&holdings);
        assert!(recs.risk.contains("1 volatile stocks (50% of holdings)"), "{}", recs.risk);
        assert!(recs.risk.contains("PENNY"));
        assert!(!recs.risk.contains("FLAT"));
    }

    #[test]
    fn calm_portfolio_risk_message() {
        let holdings = vec![ranged("KO", 55.0, 65.0), ranged("PG", 140.0, 170.0)];
        let recs = RecommendationService::default().generate(&holdings);
        assert!(recs.risk.contains("appears balanced"));
    }

    #[test]
    fn gainers_and_losers_drive_rebalancing_and_tax_loss() {
        let holdings = vec![
            holding("WIN", "Technology", 1.0, 100.0, 130.0),
            holding("LOSE", "Energy", 1.0, 100.0, 70.0),
            holding("FLAT", "Utilities", 1.0, 100.0, 105.0),
        ];
        let recs = RecommendationService::default().generate(&holdings);

        assert!(recs.rebalancing.contains("partial profits on WIN"));
        assert!(recs.rebalancing.contains("positions like LOSE"));
        assert!(recs.tax_loss.contains("candidates include LOSE"));
        assert!(!recs.tax_loss.contains("FLAT"));
    }

    #[test]
    fn no_losers_means_no_tax_loss_candidates() {
        let holdings = vec![holding("FLAT", "Utilities", 1.0, 100.0, 105.0)];
        let recs = RecommendationService::default().generate(&holdings);
        assert!(recs.tax_loss.starts_with("No significant tax loss"));
        assert!(recs.rebalancing.contains("well-balanced"));
    }

    #[test]
    fn get_returns_cached_until_forced() {
        let mut service = RecommendationService::default();
        let first = service.get(&[holding("WIN", "Technology", 1.0, 100.0, 130.0)], false);

        let losers = [holding("LOSE", "Energy", 1.0, 100.0, 50.0)];
        assert_eq!(service.get(&losers, false), first);

        let refreshed = service.get(&losers, true);
        assert!(refreshed.tax_loss.contains("LOSE"));
        assert_eq!(service.last(), Some(&refreshed));
    }

    #[test]
    fn thresholds_are_configurable() {
        let thresholds = RecommendationThresholds {
            price_move_pct: 5.0,
            ..Default::default()
        };
        let recs = RecommendationService::new(thresholds)
            .generate(&[holding("FLAT", "Utilities", 1.0, 100.0, 106.0)]);
        assert!(recs.rebalancing.contains("partial profits on FLAT"));
    }
}

// ═══════════════════════════════════════════════════════════════════
// ChartService
// ═══════════════════════════════════════════════════════════════════

mod chart_service {
    use super::*;

    #[test]
    fn empty_portfolio_has_no_charts() {
        let charts = ChartService::new().dashboard(&Portfolio::default(), PerformanceMetric::Percentage);
        assert!(charts.allocation.is_none());
        assert!(charts.gainers_losers.is_none());
        assert!(charts.week_range.is_none());
        assert!(charts.recovery.is_none());
        assert!(charts.realized_unrealized.is_none());
        assert!(charts.sector_performance.is_none());
    }

    #[test]
    fn gainers_losers_takes_five_each_side() {
        let mut holdings = Vec::new();
        for i in 1..=7 {
            holdings.push(holding(&format!("G{i}"), "Tech", 1.0, 100.0, 100.0 + i as f64));
            holdings.push(holding(&format!("L{i}"), "Tech", 1.0, 100.0, 100.0 - i as f64));
        }
        holdings.push(holding("FLAT", "Tech", 1.0, 100.0, 100.0));

        let chart = ChartService::new()
            .gainers_losers(
                &AnalyticsService::new().holding_performance(&portfolio_of(holdings)),
                PerformanceMetric::Percentage,
            )
            .unwrap();

        assert_eq!(chart.kind, ChartKind::GainersLosers);
        assert_eq!(
            chart.labels,
            vec!["L7", "L6", "L5", "L4", "L3", "G7", "G6", "G5", "G4", "G3"]
        );
        let values = &chart.dataset("Performance (%)").unwrap().values;
        assert!(approx(values[0], -7.0));
        assert!(approx(values[9], 3.0));
    }

    #[test]
    fn week_range_skips_missing_bounds_and_sorts() {
        let mut low = holding("LOW", "Tech", 1.0, 1.0, 110.0);
        low.low_52_week = Some(100.0);
        low.high_52_week = Some(200.0);
        let mut high = holding("HIGH", "Tech", 1.0, 1.0, 190.0);
        high.low_52_week = Some(100.0);
        high.high_52_week = Some(200.0);
        let unknown = holding("NONE", "Tech", 1.0, 1.0, 150.0);

        let chart = ChartService::new().week_range(&[low, unknown, high]).unwrap();
        assert_eq!(chart.labels, vec!["HIGH", "LOW"]);
        let values = &chart.datasets[0].values;
        assert!(approx(values[0], 90.0));
        assert!(approx(values[1], 10.0));
    }

    #[test]
    fn realized_unrealized_datasets() {
        let portfolio = portfolio_of(vec![holding("UP", "Tech", 10.0, 100.0, 110.0)]);
        let chart = ChartService::new()
            .dashboard(&portfolio, PerformanceMetric::Value)
            .realized_unrealized
            .unwrap();
        assert_eq!(chart.labels, vec!["Realized", "Unrealized"]);
        assert_eq!(chart.dataset("Gains").unwrap().values, vec![0.0, 100.0]);
        assert_eq!(chart.dataset("Losses").unwrap().values, vec![0.0, 0.0]);
    }

    #[test]
    fn recovery_and_sector_performance_series() {
        let portfolio = portfolio_of(vec![
            holding("DOWN", "Energy", 1.0, 100.0, 50.0),
            holding("UP", "Tech", 3.0, 100.0, 150.0),
        ]);
        let charts = ChartService::new().dashboard(&portfolio, PerformanceMetric::Percentage);

        let recovery = charts.recovery.unwrap();
        assert_eq!(recovery.labels, vec!["DOWN"]);
        assert_eq!(recovery.dataset("Percent Down").unwrap().values, vec![50.0]);
        assert_eq!(recovery.dataset("Percent to Breakeven").unwrap().values, vec![100.0]);

        let sectors = charts.sector_performance.unwrap();
        assert_eq!(sectors.labels, vec!["Tech", "Energy"]);
        assert_eq!(sectors.dataset("Return (%)").unwrap().values, vec![50.0, -50.0]);

        let allocation = charts.allocation.unwrap();
        assert_eq!(allocation.kind, ChartKind::SectorAllocation);
        assert_eq!(allocation.datasets[0].values, vec![450.0, 50.0]);
    }
}
