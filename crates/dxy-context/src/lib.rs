//! Component J: DXY Context Service.

pub mod cache;
pub mod correlation;
pub mod key_levels;
pub mod providers;
pub mod service;

pub use cache::DxyCache;
pub use correlation::{corr_strength, rolling_corr};
pub use key_levels::{check_crossings, default_levels, DxyLevel, KeyLevelCrossing, LevelType};
pub use providers::{build_provider_chain, DxyProvider};
pub use service::{ActivityPublisher, DxyContextService};
