pub mod rate_category_aggregates;
pub mod rate_combined_aggregates;
pub mod rate_comments;
pub mod rate_reactions;
pub mod rates;

pub use rate_category_aggregates::{Entity as RateCategoryAggregates, Histogram};
pub use rate_combined_aggregates::{CategoryMeans, Entity as RateCombinedAggregates};
pub use rate_comments::{CommentHistory, CommentHistoryEntry, Entity as RateComments};
pub use rate_reactions::Entity as RateReactions;
pub use rates::{CategoryValues, Entity as Rates, RateHistory, RateHistoryEntry};

// Type aliases
pub type RatingRecord = rates::Model;
pub type CategoryAggregate = rate_category_aggregates::Model;
pub type CombinedAggregate = rate_combined_aggregates::Model;
pub type RateComment = rate_comments::Model;
pub type RateReaction = rate_reactions::Model;
