pub mod errors;
pub mod models;
pub mod providers;
pub mod services;
pub mod storage;
pub mod utils;

use chrono::{DateTime, NaiveDate, Utc};
use log::{info, warn};
use models::{
    analytics::{
        GainLossSplit, HoldingPerformance, PerformanceMetric, PortfolioMetrics,
        RecoveryPotential, SectorAllocation, SectorPerformance, TopPerformers,
    },
    chart::DashboardCharts,
    dividend::{Dividend, DividendCalendar, DividendSummary, MonthlyDividends, NewDividend},
    holding::{Holding, NewHolding},
    portfolio::Portfolio,
    quote::{Quote, SymbolMatch, WeekRange},
    recommendation::Recommendations,
    settings::Settings,
    snapshot::PortfolioUpdate,
    transaction::{SellOutcome, Trade, Transaction},
};
use providers::registry::QuoteProviderRegistry;
use services::{
    analytics_service::AnalyticsService, chart_service::ChartService,
    dividend_service::DividendService, portfolio_service::PortfolioService,
    price_service::PriceService, recommendation_service::RecommendationService,
};
use std::sync::Arc;
use storage::{
    export::{self, ImportSummary},
    records::{HoldingRecord, TransactionRecord},
    traits::PortfolioStore,
};
use tokio::sync::broadcast;
use uuid::Uuid;

use errors::CoreError;

/// Buffered change events per subscriber before the slowest one lags.
const UPDATE_CHANNEL_CAPACITY: usize = 16;

/// Main entry point for the stock portfolio core library.
/// Holds one user's ledger, the services that operate on it and the store
/// it is persisted to.
///
/// Every mutation is applied in memory first and then written to the
/// store. If the write fails the in-memory state is put back and a
/// `Persistence` error is returned, so memory never runs ahead of the store.
#[must_use]
pub struct PortfolioTracker {
    user_id: String,
    settings: Settings,
    portfolio: Portfolio,
    dividends: Vec<Dividend>,
    store: Arc<dyn PortfolioStore>,
    portfolio_service: PortfolioService,
    analytics_service: AnalyticsService,
    price_service: PriceService,
    chart_service: ChartService,
    dividend_service: DividendService,
    recommendation_service: RecommendationService,
    updates: broadcast::Sender<PortfolioUpdate>,
    last_price_update: Option<DateTime<Utc>>,
}

impl std::fmt::Debug for PortfolioTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PortfolioTracker")
            .field("user_id", &self.user_id)
            .field("holdings", &self.portfolio.holdings.len())
            .field("transactions", &self.portfolio.transactions.len())
            .field("dividends", &self.dividends.len())
            .field("last_price_update", &self.last_price_update)
            .finish()
    }
}

impl PortfolioTracker {
    /// Create an empty tracker for `user_id`, with providers taken from
    /// the API keys in `settings`. Call [`load`](Self::load) to fetch the
    /// stored ledger.
    pub fn new(user_id: impl Into<String>, settings: Settings, store: Arc<dyn PortfolioStore>) -> Self {
        let registry = QuoteProviderRegistry::new_with_defaults(&settings);
        Self::with_registry(user_id, settings, store, registry)
    }

    /// Same as [`new`](Self::new) with an explicit provider registry.
    pub fn with_registry(
        user_id: impl Into<String>,
        settings: Settings,
        store: Arc<dyn PortfolioStore>,
        registry: QuoteProviderRegistry,
    ) -> Self {
        let price_service = PriceService::new(registry, settings.market_data.clone());
        let recommendation_service = RecommendationService::new(settings.recommendations.clone());
        let (updates, _) = broadcast::channel(UPDATE_CHANNEL_CAPACITY);

        Self {
            user_id: user_id.into(),
            settings,
            portfolio: Portfolio::default(),
            dividends: Vec::new(),
            store,
            portfolio_service: PortfolioService::new(),
            analytics_service: AnalyticsService::new(),
            price_service,
            chart_service: ChartService::new(),
            dividend_service: DividendService::new(),
            recommendation_service,
            updates,
            last_price_update: None,
        }
    }

    #[must_use]
    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    #[must_use]
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    // ── Sync with the store ─────────────────────────────────────────

    /// Replace the in-memory state with what the store holds for this user.
    pub async fn load(&mut self) -> Result<(), CoreError> {
        let snapshot = self.store.load_snapshot(&self.user_id).await?;
        let dividends = self.store.load_dividends(&self.user_id).await?;
        info!(
            "Loaded portfolio for {}: {} holdings, {} transactions, {} dividends",
            self.user_id,
            snapshot.holdings.len(),
            snapshot.transactions.len(),
            dividends.len()
        );
        self.dividends = dividends;
        self.apply_snapshot(snapshot);
        Ok(())
    }

    /// Apply a snapshot pushed by the store. Replaces, never merges.
    pub fn apply_snapshot(&mut self, snapshot: Portfolio) {
        self.portfolio_service
            .apply_snapshot(&mut self.portfolio, snapshot);
        self.broadcast();
    }

    /// Subscribe to change events. One [`PortfolioUpdate`] is sent per
    /// successful mutation or applied snapshot.
    pub fn subscribe(&self) -> broadcast::Receiver<PortfolioUpdate> {
        self.updates.subscribe()
    }

    // ── Ledger Mutations ────────────────────────────────────────────

    /// Add a holding and its initial buy transaction.
    pub async fn add_holding(&mut self, new: NewHolding) -> Result<(Holding, Transaction), CoreError> {
        let before = self.portfolio.clone();
        let (holding, transaction) =
            self.portfolio_service
                .add_holding(&mut self.portfolio, new, Utc::now())?;

        let stored = match self.store_holding(&holding, None).await {
            Ok(()) => self.store_transaction(&transaction).await,
            Err(e) => Err(e),
        };
        if let Err(e) = stored {
            return Err(self.rollback(before, e));
        }

        self.broadcast();
        Ok((holding, transaction))
    }

    pub async fn buy_more(
        &mut self,
        holding_id: Uuid,
        trade: &Trade,
    ) -> Result<(Holding, Transaction), CoreError> {
        let before = self.portfolio.clone();
        let (holding, transaction) =
            self.portfolio_service
                .buy_more(&mut self.portfolio, holding_id, trade)?;

        let stored = match self.store_holding(&holding, None).await {
            Ok(()) => self.store_transaction(&transaction).await,
            Err(e) => Err(e),
        };
        if let Err(e) = stored {
            return Err(self.rollback(before, e));
        }

        self.broadcast();
        Ok((holding, transaction))
    }

    /// Sell units of a holding. Selling everything deletes the holding from
    /// the store too; its transactions stay.
    pub async fn sell(&mut self, holding_id: Uuid, trade: &Trade) -> Result<SellOutcome, CoreError> {
        let before = self.portfolio.clone();
        let outcome = self
            .portfolio_service
            .sell(&mut self.portfolio, holding_id, trade)?;

        let stored = match self.store_transaction(&outcome.transaction).await {
            Ok(()) => match &outcome.holding {
                Some(holding) => self.store_holding(holding, None).await,
                None => self.store.delete_holding(&self.user_id, holding_id).await,
            },
            Err(e) => Err(e),
        };
        if let Err(e) = stored {
            return Err(self.rollback(before, e));
        }

        self.broadcast();
        Ok(outcome)
    }

    /// Remove a holding without recording a transaction.
    pub async fn delete_holding(&mut self, holding_id: Uuid) -> Result<Holding, CoreError> {
        let before = self.portfolio.clone();
        let removed = self
            .portfolio_service
            .delete_holding(&mut self.portfolio, holding_id)?;

        if let Err(e) = self.store.delete_holding(&self.user_id, holding_id).await {
            return Err(self.rollback(before, e));
        }

        self.broadcast();
        Ok(removed)
    }

    /// Overwrite a holding's market price by hand.
    pub async fn set_current_price(&mut self, holding_id: Uuid, price: f64) -> Result<Holding, CoreError> {
        let before = self.portfolio.clone();
        let holding = self
            .portfolio_service
            .set_current_price(&mut self.portfolio, holding_id, price)?;

        if let Err(e) = self.store_holding(&holding, None).await {
            return Err(self.rollback(before, e));
        }

        self.broadcast();
        Ok(holding)
    }

    /// Fetch fresh quotes for every holding and store the new prices.
    ///
    /// Symbols whose quote fails keep their old price. Returns how many
    /// holdings were updated.
    pub async fn refresh_prices(&mut self) -> Result<usize, CoreError> {
        let updates = self
            .price_service
            .update_prices(&self.portfolio.holdings)
            .await;
        let now = Utc::now();

        let before = self.portfolio.clone();
        let mut refreshed = Vec::with_capacity(updates.len());
        for update in &updates {
            // a holding can only disappear here if the store pushed a snapshot meanwhile
            match self.portfolio_service.set_current_price(
                &mut self.portfolio,
                update.id,
                update.current_price,
            ) {
                Ok(holding) => refreshed.push(holding),
                Err(e) => warn!("Skipping price update for {}: {e}", update.id),
            }
        }

        for holding in &refreshed {
            if let Err(e) = self.store_holding(holding, Some(now)).await {
                return Err(self.rollback(before, e));
            }
        }

        self.last_price_update = Some(now);
        info!(
            "Refreshed prices for {} of {} holdings",
            refreshed.len(),
            self.portfolio.holdings.len()
        );
        self.broadcast();
        Ok(refreshed.len())
    }

    // ── Import / Export ─────────────────────────────────────────────

    /// The ledger as a pretty-printed `{ stocks, transactions }` document.
    pub fn export_json(&self) -> Result<String, CoreError> {
        export::export_json(&self.portfolio)
    }

    /// Import an export file, either replacing the ledger or appending to it.
    pub async fn import_json(
        &mut self,
        json: &str,
        replace_existing: bool,
    ) -> Result<ImportSummary, CoreError> {
        let file = export::parse_import(json)?;
        let (merged, summary) = export::apply_import(&self.portfolio, file, replace_existing);

        let before = std::mem::replace(&mut self.portfolio, merged);
        if let Err(e) = self.store.replace_all(&self.user_id, &self.portfolio).await {
            return Err(self.rollback(before, e));
        }

        info!(
            "Imported {} holdings and {} transactions ({})",
            summary.holdings,
            summary.transactions,
            if replace_existing { "replace" } else { "merge" }
        );
        self.broadcast();
        Ok(summary)
    }

    // ── Ledger Queries ──────────────────────────────────────────────

    #[must_use]
    pub fn portfolio(&self) -> &Portfolio {
        &self.portfolio
    }

    #[must_use]
    pub fn holdings(&self) -> &[Holding] {
        &self.portfolio.holdings
    }

    #[must_use]
    pub fn get_holding(&self, holding_id: Uuid) -> Option<&Holding> {
        self.portfolio_service
            .get_holding(&self.portfolio, holding_id)
    }

    /// All transactions, newest first.
    #[must_use]
    pub fn get_transactions(&self) -> Vec<&Transaction> {
        self.portfolio_service.get_transactions(&self.portfolio)
    }

    #[must_use]
    pub fn get_transactions_for_holding(&self, holding_id: Uuid) -> Vec<&Transaction> {
        self.portfolio_service
            .get_transactions_for_holding(&self.portfolio, holding_id)
    }

    // ── Analytics ───────────────────────────────────────────────────

    #[must_use]
    pub fn metrics(&self) -> PortfolioMetrics {
        self.analytics_service.metrics(&self.portfolio)
    }

    #[must_use]
    pub fn holding_performance(&self) -> Vec<HoldingPerformance> {
        self.analytics_service.holding_performance(&self.portfolio)
    }

    #[must_use]
    pub fn top_performers(&self, metric: PerformanceMetric) -> TopPerformers {
        self.analytics_service
            .top_performers(&self.portfolio, metric)
    }

    #[must_use]
    pub fn sector_allocation(&self) -> Vec<SectorAllocation> {
        self.analytics_service.sector_allocation(&self.portfolio)
    }

    #[must_use]
    pub fn gain_loss_split(&self) -> GainLossSplit {
        self.analytics_service.gain_loss_split(&self.portfolio)
    }

    #[must_use]
    pub fn recovery_potential(&self) -> Vec<RecoveryPotential> {
        self.analytics_service.recovery_potential(&self.portfolio)
    }

    #[must_use]
    pub fn sector_performance(&self) -> Vec<SectorPerformance> {
        self.analytics_service.sector_performance(&self.portfolio)
    }

    /// The full change event for the current state.
    #[must_use]
    pub fn snapshot(&self) -> PortfolioUpdate {
        PortfolioUpdate {
            holdings: self.portfolio.holdings.clone(),
            transactions: self.portfolio.transactions.clone(),
            metrics: self.metrics(),
            performers: self.top_performers(PerformanceMetric::Percentage),
            sector_allocation: self.sector_allocation(),
            gain_loss: self.gain_loss_split(),
            recovery: self.recovery_potential(),
            sector_performance: self.sector_performance(),
        }
    }

    /// Format a money amount with the configured currency symbol.
    #[must_use]
    pub fn format_currency(&self, value: f64) -> String {
        utils::format_currency(value, &self.settings.currency_symbol)
    }

    // ── Charts ──────────────────────────────────────────────────────

    #[must_use]
    pub fn charts(&self, metric: PerformanceMetric) -> DashboardCharts {
        self.chart_service.dashboard(&self.portfolio, metric)
    }

    // ── Recommendations ─────────────────────────────────────────────

    /// Advice for the current holdings; cached until `force_refresh`.
    pub fn recommendations(&mut self, force_refresh: bool) -> Recommendations {
        self.recommendation_service
            .get(&self.portfolio.holdings, force_refresh)
    }

    // ── Dividends ───────────────────────────────────────────────────

    pub async fn add_dividend(&mut self, new: NewDividend) -> Result<Dividend, CoreError> {
        let dividend = self.dividend_service.create(new)?;

        if let Err(e) = self.store.save_dividend(&self.user_id, &dividend).await {
            warn!("Failed to store dividend for {}: {e}", dividend.ticker);
            return Err(as_persistence(e));
        }

        info!(
            "Recorded {} dividend of {} on {}",
            dividend.ticker, dividend.total_amount, dividend.payment_date
        );
        self.dividends.push(dividend.clone());
        self.broadcast();
        Ok(dividend)
    }

    #[must_use]
    pub fn dividends(&self) -> &[Dividend] {
        &self.dividends
    }

    /// Dividends going ex within the configured window from `today`.
    #[must_use]
    pub fn upcoming_dividends(&self, today: NaiveDate) -> Vec<Dividend> {
        self.dividend_service.upcoming(
            &self.dividends,
            today,
            self.settings.upcoming_dividend_days,
        )
    }

    #[must_use]
    pub fn dividend_summary(&self) -> DividendSummary {
        let value = self.metrics().total_value;
        self.dividend_service.summary(&self.dividends, value)
    }

    #[must_use]
    pub fn monthly_dividends(&self, today: NaiveDate) -> Vec<MonthlyDividends> {
        self.dividend_service
            .monthly_history(&self.dividends, today)
    }

    pub fn dividend_calendar(&self, year: i32, month: u32) -> Result<DividendCalendar, CoreError> {
        self.dividend_service
            .calendar(&self.dividends, year, month)
    }

    // ── Market Data ─────────────────────────────────────────────────

    pub async fn get_quote(&self, symbol: &str) -> Result<Quote, CoreError> {
        self.price_service.get_quote(symbol).await
    }

    pub async fn get_52_week_range(&self, symbol: &str) -> Result<WeekRange, CoreError> {
        self.price_service
            .get_52_week_range(symbol, Utc::now().date_naive())
            .await
    }

    pub async fn search_symbols(&self, keywords: &str) -> Result<Vec<SymbolMatch>, CoreError> {
        self.price_service.search_symbols(keywords).await
    }

    /// When [`refresh_prices`](Self::refresh_prices) last completed.
    #[must_use]
    pub fn last_price_update(&self) -> Option<DateTime<Utc>> {
        self.last_price_update
    }

    // ── Provider Availability ───────────────────────────────────────

    #[must_use]
    pub fn is_provider_available(&self) -> bool {
        self.price_service.has_provider()
    }

    #[must_use]
    pub fn get_provider_names(&self) -> Vec<String> {
        self.price_service.get_provider_names()
    }

    // ── Internal ────────────────────────────────────────────────────

    async fn store_holding(
        &self,
        holding: &Holding,
        refreshed_at: Option<DateTime<Utc>>,
    ) -> Result<(), CoreError> {
        let record = HoldingRecord::new(&self.user_id, holding.clone());
        let record = match refreshed_at {
            Some(at) => record.refreshed_at(at),
            None => record,
        };
        self.store.upsert_holding(&self.user_id, &record).await
    }

    async fn store_transaction(&self, transaction: &Transaction) -> Result<(), CoreError> {
        let record = TransactionRecord::new(&self.user_id, transaction.clone());
        self.store.append_transaction(&self.user_id, &record).await
    }

    /// Put the ledger back after a failed store write.
    fn rollback(&mut self, before: Portfolio, error: CoreError) -> CoreError {
        warn!("Store write failed for {}, rolling back: {error}", self.user_id);
        self.portfolio = before;
        as_persistence(error)
    }

    fn broadcast(&self) {
        // No receivers is fine.
        let _ = self.updates.send(self.snapshot());
    }
}

fn as_persistence(error: CoreError) -> CoreError {
    match error {
        CoreError::Persistence(_) => error,
        other => CoreError::Persistence(other.to_string()),
    }
}
