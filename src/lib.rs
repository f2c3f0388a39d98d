//! LP Portfolio
//!
//! Discovers a wallet's constant-product LP positions and values them in USD:
//! - List the wallet's token balances from a chain indexer
//! - Probe each held token for the pair interface
//! - Split pool reserves by the wallet's share with exact integer math
//! - Price both legs from a USD price source
//!
//! Every external collaborator sits behind a trait so the valuation core can
//! run against in-memory fakes.

pub mod chain;
pub mod config;
pub mod indexer;
pub mod math;
pub mod positions;
pub mod price;
pub mod server;

mod error;

// Re-export commonly used types
pub use config::{Config, Network, RpcConfig};
pub use error::{Error, Result};
pub use positions::{PortfolioAggregator, Position, PositionValuator};
