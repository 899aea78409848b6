pub mod engine;
pub mod snippet;

pub use engine::{DomainOverview, DomainPage, QueryEngine, SearchHit, StatsPage};
pub use snippet::match_context;
