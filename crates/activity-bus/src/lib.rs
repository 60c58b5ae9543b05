//! Component L: Activity Bus.

pub mod bus;

pub use bus::{ActivityBus, ActivitySubscription, CAPACITY};
