//! Wallet-level aggregation
//!
//! Validates the wallet address, lists its balances, and values every
//! candidate as its own task. Candidate failures are dropped; only an
//! indexer outage or the request deadline fails the request.

use super::model::Position;
use super::valuator::PositionValuator;
use crate::indexer::{BalanceIndexer, RawBalance};
use crate::{Error, Result};
use alloy::primitives::Address;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tracing::Instrument;
use uuid::Uuid;

/// Parse a wallet address from user input
///
/// Accepts surrounding whitespace and an optional lowercase `0x` prefix.
/// Mixed-case input must carry a valid EIP-55 checksum.
pub fn parse_wallet_address(input: &str) -> Result<Address> {
    let trimmed = input.trim();
    let digits = trimmed.strip_prefix("0x").unwrap_or(trimmed);

    if digits.len() != 40 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(Error::InvalidAddress(trimmed.to_string()));
    }

    let prefixed = format!("0x{digits}");
    let mixed_case = digits.chars().any(|c| c.is_ascii_lowercase())
        && digits.chars().any(|c| c.is_ascii_uppercase());

    let parsed = if mixed_case {
        Address::parse_checksummed(&prefixed, None).ok()
    } else {
        prefixed.parse::<Address>().ok()
    };

    parsed.ok_or_else(|| Error::InvalidAddress(trimmed.to_string()))
}

/// Non-zero balances, first `limit` in indexer order
pub fn select_candidates(balances: Vec<RawBalance>, limit: usize) -> Vec<RawBalance> {
    balances
        .into_iter()
        .filter(RawBalance::is_candidate)
        .take(limit)
        .collect()
}

/// Produces the position list for a wallet
#[derive(Clone)]
pub struct PortfolioAggregator {
    valuator: PositionValuator,
    indexer: Arc<dyn BalanceIndexer>,
    candidate_limit: usize,
    request_timeout: Duration,
}

impl PortfolioAggregator {
    pub fn new(
        valuator: PositionValuator,
        indexer: Arc<dyn BalanceIndexer>,
        candidate_limit: usize,
        request_timeout: Duration,
    ) -> Self {
        Self {
            valuator,
            indexer,
            candidate_limit: candidate_limit.max(1),
            request_timeout,
        }
    }

    pub fn with_candidate_limit(mut self, limit: usize) -> Self {
        self.candidate_limit = limit.max(1);
        self
    }

    /// Positions held by the wallet named in `address`
    ///
    /// The address is validated before any collaborator is contacted.
    pub async fn positions_for_wallet(&self, address: &str) -> Result<Vec<Position>> {
        let wallet = parse_wallet_address(address)?;
        let request_id = Uuid::new_v4();
        let span = tracing::info_span!("positions", %request_id, wallet = %wallet);

        match tokio::time::timeout(self.request_timeout, self.positions(wallet).instrument(span))
            .await
        {
            Ok(result) => result,
            Err(_) => {
                let timeout_ms = self.request_timeout.as_millis() as u64;
                tracing::warn!(%request_id, wallet = %wallet, timeout_ms, "Request deadline exceeded");
                Err(Error::Deadline(timeout_ms))
            }
        }
    }

    /// Positions held by `wallet`, without a deadline
    pub async fn positions(&self, wallet: Address) -> Result<Vec<Position>> {
        let balances = self
            .indexer
            .token_balances(wallet, self.candidate_limit)
            .await
            .inspect_err(|e| tracing::error!(error = %e, "Failed to list token balances"))?;

        let listed = balances.len();
        let candidates = select_candidates(balances, self.candidate_limit);
        tracing::info!(listed, candidates = candidates.len(), "Valuing candidates");

        let positions = self.value_candidates(candidates).await;
        tracing::info!(positions = positions.len(), "Valued positions");

        Ok(positions)
    }

    /// Value each candidate in its own task; results keep input order
    async fn value_candidates(&self, candidates: Vec<RawBalance>) -> Vec<Position> {
        let mut tasks = JoinSet::new();
        for (index, balance) in candidates.into_iter().enumerate() {
            let valuator = self.valuator.clone();
            tasks.spawn(
                async move {
                    let result = valuator.value(&balance).await;
                    (index, balance.contract_address, result)
                }
                .in_current_span(),
            );
        }

        let mut valued = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, _, Ok(Some(position)))) => valued.push((index, position)),
                Ok((_, _, Ok(None))) => {}
                Ok((_, address, Err(e))) => {
                    tracing::warn!(address = %address, error = %e, "Dropping candidate");
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Candidate task failed");
                }
            }
        }

        valued.sort_by_key(|(index, _)| *index);
        valued.into_iter().map(|(_, position)| position).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::abi::IUniswapV2Pair;
    use crate::chain::testing::FakeReader;
    use crate::indexer::testing::FakeIndexer;
    use crate::positions::valuator::tests::{add_pair, add_tokens, PAIR, USDC, WETH};
    use crate::price::testing::FakePrices;
    use crate::price::PriceSource;
    use alloy::primitives::{address, U256};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Instant;

    const WALLET: &str = "0x00000000000000000000000000000000000000aa";
    const PAIR_B: Address = address!("A478c2975Ab1Ea89e8196811F51A7B7Ade33eB11");
    const PLAIN: Address = address!("6B175474E89094C44Da98b954EedeAC495271d0F");

    fn aggregator(
        reader: FakeReader,
        prices: impl PriceSource + 'static,
        indexer: Arc<FakeIndexer>,
    ) -> PortfolioAggregator {
        let valuator = PositionValuator::new(Arc::new(reader), Arc::new(prices));
        PortfolioAggregator::new(valuator, indexer, 80, Duration::from_secs(5))
    }

    fn two_pair_reader() -> FakeReader {
        let mut reader = FakeReader::new();
        add_pair(&mut reader, PAIR, (USDC, WETH), (1_000_000, 2_000_000), U256::from(500u64));
        add_pair(&mut reader, PAIR_B, (WETH, USDC), (3_000, 4_000), U256::from(10u64));
        add_tokens(&mut reader);
        reader
    }

    #[test]
    fn test_parse_wallet_address() {
        let lower = "0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48";
        assert_eq!(parse_wallet_address(lower).unwrap(), USDC);
        assert_eq!(
            parse_wallet_address(&format!("0x{}", lower[2..].to_uppercase())).unwrap(),
            USDC
        );
        assert_eq!(parse_wallet_address(&format!("  {lower}\n")).unwrap(), USDC);
        assert_eq!(parse_wallet_address(&lower[2..]).unwrap(), USDC);
        assert_eq!(
            parse_wallet_address("0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48").unwrap(),
            USDC
        );
    }

    #[test]
    fn test_rejects_bad_addresses() {
        for input in [
            "",
            "0x",
            "hello",
            "0x1234",
            "0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb4",
            "0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb488",
            "0xg0b86991c6218b36c1d19d4a2e9eb0ce3606eb48",
            // bad checksum
            "0xa0B86991c6218b36c1d19D4a2e9Eb0cE3606eB48",
            // only a lowercase prefix
            "0Xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48",
        ] {
            assert!(
                matches!(parse_wallet_address(input), Err(Error::InvalidAddress(_))),
                "{input:?}"
            );
        }
    }

    #[test]
    fn test_select_candidates() {
        let balances = vec![
            RawBalance::new(address!("0000000000000000000000000000000000000001"), "0x0"),
            RawBalance::new(address!("0000000000000000000000000000000000000002"), "0x5"),
            RawBalance::new(address!("0000000000000000000000000000000000000003"), "0x"),
            RawBalance::new(address!("0000000000000000000000000000000000000004"), "0x1"),
            RawBalance::new(address!("0000000000000000000000000000000000000005"), "0x2"),
        ];

        let selected = select_candidates(balances, 2);
        assert_eq!(
            selected.iter().map(|b| b.contract_address).collect::<Vec<_>>(),
            vec![
                address!("0000000000000000000000000000000000000002"),
                address!("0000000000000000000000000000000000000004"),
            ]
        );
    }

    #[tokio::test]
    async fn test_only_pools_become_positions_in_input_order() {
        let indexer = Arc::new(FakeIndexer::new(vec![
            RawBalance::new(PLAIN, "0x100"),
            RawBalance::new(PAIR_B, "0x1"),
            RawBalance::new(USDC, "0x10"),
            RawBalance::new(PAIR, "0x32"),
            RawBalance::new(WETH, "0x0"),
        ]));
        let prices = FakePrices::new().with(USDC, 1.0).with(WETH, 2.0);
        let aggregator = aggregator(two_pair_reader(), prices, indexer.clone());

        let positions = aggregator.positions_for_wallet(WALLET).await.unwrap();

        assert_eq!(
            positions.iter().map(|p| p.pair_address).collect::<Vec<_>>(),
            vec![PAIR_B, PAIR]
        );
        assert_eq!(positions[1].token0.user_amount, U256::from(100_000u64));
        assert_eq!(positions[1].token1.user_amount, U256::from(200_000u64));
        assert_eq!(indexer.requests(), 1);
    }

    #[tokio::test]
    async fn test_candidate_limit_caps_probing() {
        let indexer = Arc::new(FakeIndexer::new(vec![
            RawBalance::new(PAIR_B, "0x1"),
            RawBalance::new(PAIR, "0x32"),
        ]));
        let aggregator =
            aggregator(two_pair_reader(), FakePrices::new(), indexer).with_candidate_limit(1);

        let positions = aggregator.positions_for_wallet(WALLET).await.unwrap();
        assert_eq!(positions.len(), 1);
        assert_eq!(positions[0].pair_address, PAIR_B);
    }

    #[tokio::test]
    async fn test_invalid_address_makes_no_calls() {
        let indexer = Arc::new(FakeIndexer::new(vec![RawBalance::new(PAIR, "0x32")]));
        let aggregator = aggregator(two_pair_reader(), FakePrices::new(), indexer.clone());

        let err = aggregator.positions_for_wallet("not-an-address").await.unwrap_err();
        assert!(err.is_client_error());
        assert_eq!(indexer.requests(), 0);
    }

    #[tokio::test]
    async fn test_indexer_outage_fails_request() {
        let indexer = Arc::new(FakeIndexer::unreachable());
        let aggregator = aggregator(two_pair_reader(), FakePrices::new(), indexer);

        let err = aggregator.positions_for_wallet(WALLET).await.unwrap_err();
        assert!(matches!(err, Error::Indexer(_)));
        assert!(!err.is_client_error());
    }

    #[tokio::test]
    async fn test_empty_wallet() {
        let indexer = Arc::new(FakeIndexer::new(Vec::new()));
        let aggregator = aggregator(two_pair_reader(), FakePrices::new(), indexer);

        assert!(aggregator.positions_for_wallet(WALLET).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_failing_candidate_does_not_affect_siblings() {
        let mut reader = two_pair_reader();
        reader.fail::<IUniswapV2Pair::getReservesCall>(
            PAIR_B,
            crate::chain::Unavailable::Timeout(10_000),
        );
        let indexer = Arc::new(FakeIndexer::new(vec![
            RawBalance::new(PAIR_B, "0x1"),
            RawBalance::new(PAIR, "0x32"),
        ]));
        let aggregator = aggregator(reader, FakePrices::new(), indexer);

        let positions = aggregator.positions_for_wallet(WALLET).await.unwrap();
        assert_eq!(positions.len(), 1);
        assert_eq!(positions[0].pair_address, PAIR);
    }

    struct PanickingPrices;

    #[async_trait]
    impl PriceSource for PanickingPrices {
        async fn usd_price(&self, token: Address) -> Option<f64> {
            if token == WETH {
                panic!("price source blew up");
            }
            Some(1.0)
        }
    }

    #[tokio::test]
    async fn test_panicking_candidate_is_dropped() {
        let mut reader = FakeReader::new();
        add_pair(&mut reader, PAIR, (USDC, WETH), (1_000, 1_000), U256::from(10u64));
        add_pair(&mut reader, PAIR_B, (USDC, PLAIN), (1_000, 1_000), U256::from(10u64));
        let indexer = Arc::new(FakeIndexer::new(vec![
            RawBalance::new(PAIR, "0x1"),
            RawBalance::new(PAIR_B, "0x1"),
        ]));
        let aggregator = aggregator(reader, PanickingPrices, indexer);

        let positions = aggregator.positions_for_wallet(WALLET).await.unwrap();
        assert_eq!(positions.len(), 1);
        assert_eq!(positions[0].pair_address, PAIR_B);
    }

    #[tokio::test]
    async fn test_request_deadline() {
        let mut reader = two_pair_reader();
        reader.delay(PAIR, Duration::from_secs(5));
        let indexer = Arc::new(FakeIndexer::new(vec![RawBalance::new(PAIR, "0x32")]));
        let valuator = PositionValuator::new(Arc::new(reader), Arc::new(FakePrices::new()));
        let aggregator =
            PortfolioAggregator::new(valuator, indexer, 80, Duration::from_millis(50));

        let err = aggregator.positions_for_wallet(WALLET).await.unwrap_err();
        assert!(matches!(err, Error::Deadline(50)));
    }

    #[tokio::test]
    async fn test_candidates_are_valued_concurrently() {
        let delay = Duration::from_millis(300);
        let mut reader = two_pair_reader();
        reader.delay(PAIR, delay).delay(PAIR_B, delay);
        let indexer = Arc::new(FakeIndexer::new(vec![
            RawBalance::new(PAIR, "0x32"),
            RawBalance::new(PAIR_B, "0x1"),
        ]));
        let aggregator = aggregator(reader, FakePrices::new(), indexer);

        let started = Instant::now();
        let positions = aggregator.positions_for_wallet(WALLET).await.unwrap();
        let elapsed = started.elapsed();

        assert_eq!(positions.len(), 2);
        assert!(elapsed < delay * 2, "took {elapsed:?}");
    }

    /// Sleeps before answering, then records that it got that far
    struct SlowPrices {
        delay: Duration,
        finished: Arc<AtomicBool>,
    }

    #[async_trait]
    impl PriceSource for SlowPrices {
        async fn usd_price(&self, _token: Address) -> Option<f64> {
            tokio::time::sleep(self.delay).await;
            self.finished.store(true, Ordering::SeqCst);
            Some(1.0)
        }
    }

    #[tokio::test]
    async fn test_deadline_aborts_in_flight_candidates() {
        let finished = Arc::new(AtomicBool::new(false));
        let prices = SlowPrices {
            delay: Duration::from_millis(200),
            finished: finished.clone(),
        };
        let indexer = Arc::new(FakeIndexer::new(vec![RawBalance::new(PAIR, "0x32")]));
        let valuator = PositionValuator::new(Arc::new(two_pair_reader()), Arc::new(prices));
        let aggregator =
            PortfolioAggregator::new(valuator, indexer, 80, Duration::from_millis(50));

        let err = aggregator.positions_for_wallet(WALLET).await.unwrap_err();
        assert!(matches!(err, Error::Deadline(50)));

        // well past the point the price lookup would have finished
        tokio::time::sleep(Duration::from_millis(400)).await;
        assert!(!finished.load(Ordering::SeqCst));
    }
}
