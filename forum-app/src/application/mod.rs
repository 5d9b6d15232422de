mod vote_aggregator;

pub use vote_aggregator::VoteAggregator;
