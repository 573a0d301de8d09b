pub mod rate_category_aggregates;
pub mod rate_combined_aggregates;
pub mod rate_comments;
pub mod rate_reactions;
pub mod rates;

pub use rate_category_aggregates::CategoryAggregatesDao;
pub use rate_combined_aggregates::CombinedAggregatesDao;
pub use rate_comments::RateCommentsDao;
pub use rate_reactions::RateReactionsDao;
pub use rates::RatesDao;
