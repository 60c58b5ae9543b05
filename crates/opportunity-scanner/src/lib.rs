//! Component G: Opportunity Scanner.

pub mod scanner;
pub mod universe;

pub use scanner::{CandleStore, OpportunityScanner, SignalSink};
pub use universe::{parse_universe, rank_score, Universe};
