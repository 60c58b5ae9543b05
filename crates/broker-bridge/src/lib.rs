//! The broker bridge transport: a typed request/reply protocol (spec §6)
//! over a single persistent connection (spec §9).

pub mod client;
pub mod protocol;

pub use client::BridgeClient;
pub use protocol::{
    parse_fill, parse_orders, parse_positions, parse_rates, reply_error, BridgeRequest, RawOrder, RawPosition,
    RawRate,
};
