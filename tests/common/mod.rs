//! Shared utilities for integration tests.
//!
//! Provides the test result alias and small waiting helpers used across test
//! binaries.

// Items in this shared module may not be used by all test binaries that import it.
#![allow(
    dead_code,
    reason = "shared test utilities are not used by all test binaries"
)]

use peerframe::{ConnectionState, Peer, Transporter};
use peerframe_testing::RECV_TIMEOUT;
use tokio::time::timeout;

/// Result type for fallible integration tests.
pub type TestResult<T = ()> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// Wait until `transporter` reaches `target`.
pub async fn wait_for_state<P: Peer>(
    transporter: &Transporter<P>,
    target: ConnectionState,
) -> TestResult {
    let mut state = transporter.watch_state();
    timeout(RECV_TIMEOUT, state.wait_for(|state| *state == target))
        .await?
        .map(|_| ())?;
    Ok(())
}
