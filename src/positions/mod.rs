//! LP position discovery and valuation
//!
//! - `prober`: decides whether a held token is a constant-product pair
//! - `metadata`: best-effort ERC20 symbol and decimals
//! - `valuator`: one candidate to one [`Position`]
//! - `portfolio`: one wallet to its position list

pub mod metadata;
pub mod model;
pub mod portfolio;
pub mod prober;
pub mod valuator;

pub use model::{PairMetadata, PoolKind, Position, TokenInfo, Valuation, ValuedLeg};
pub use portfolio::{parse_wallet_address, select_candidates, PortfolioAggregator};
pub use valuator::{PositionValuator, ValuationError};
