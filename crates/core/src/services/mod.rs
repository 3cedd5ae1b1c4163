pub mod analytics_service;
pub mod chart_service;
pub mod dividend_service;
pub mod portfolio_service;
pub mod price_service;
pub mod recommendation_service;
