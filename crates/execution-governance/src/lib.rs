//! Component H: Execution Governance.

pub mod governance;
pub mod settings;

pub use governance::{post_trade_update, pre_trade_gate, GovernanceDecision};
