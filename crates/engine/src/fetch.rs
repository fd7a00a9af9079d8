use std::time::Duration;

use tracing::{debug, warn};

use common::{Bar, Error, MarketDataSource, Result, Timeframe};

/// How often and how patiently a bar fetch is retried before the symbol is
/// skipped for the cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            backoff: Duration::from_secs(1),
        }
    }
}

/// Fetch the most recent `count` bars, retrying with a fixed backoff.
///
/// An empty series counts as a failed attempt. After the last attempt the
/// error is always `DataUnavailable`.
pub async fn fetch_with_retry(
    source: &dyn MarketDataSource,
    symbol: &str,
    timeframe: Timeframe,
    count: usize,
    policy: RetryPolicy,
) -> Result<Vec<Bar>> {
    let attempts = policy.attempts.max(1);

    for attempt in 1..=attempts {
        match source.fetch_recent_bars(symbol, timeframe, count).await {
            Ok(bars) if !bars.is_empty() => {
                debug!(symbol = %symbol, bars = bars.len(), attempt = attempt, "Bars fetched");
                return Ok(bars);
            }
            Ok(_) => {
                warn!(symbol = %symbol, attempt = attempt, "Empty bar series returned");
            }
            Err(e) => {
                warn!(symbol = %symbol, attempt = attempt, error = %e, "Bar fetch failed");
            }
        }
        if attempt < attempts {
            tokio::time::sleep(policy.backoff).await;
        }
    }

    Err(Error::DataUnavailable {
        symbol: symbol.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use common::TerminalSession;
    use paper::PaperTerminal;

    fn bars(n: usize) -> Vec<Bar> {
        (0..n)
            .map(|i| Bar {
                timestamp: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
                open: 1.1,
                high: 1.1,
                low: 1.1,
                close: 1.1 + i as f64 * 0.0001,
                volume: 1.0,
            })
            .collect()
    }

    async fn terminal() -> PaperTerminal {
        let terminal = PaperTerminal::new(0.0, 0.0);
        terminal.connect().await.unwrap();
        terminal
    }

    #[tokio::test(start_paused = true)]
    async fn recovers_after_transient_failures() {
        let terminal = terminal().await;
        terminal.set_bars("EURUSD", bars(10)).await;
        terminal.fail_next_fetches("EURUSD", 2).await;

        let started = tokio::time::Instant::now();
        let got = fetch_with_retry(&terminal, "EURUSD", Timeframe::M15, 5, RetryPolicy::default())
            .await
            .unwrap();

        assert_eq!(got.len(), 5);
        assert_eq!(terminal.journal().await.fetches["EURUSD"], 3);
        assert_eq!(started.elapsed(), Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn gives_up_after_three_attempts() {
        let terminal = terminal().await;

        let err = fetch_with_retry(&terminal, "XAUUSD", Timeframe::M15, 100, RetryPolicy::default())
            .await
            .unwrap_err();

        assert!(matches!(err, Error::DataUnavailable { ref symbol } if symbol == "XAUUSD"));
        assert_eq!(terminal.journal().await.fetches["XAUUSD"], 3);
    }

    #[tokio::test]
    async fn zero_attempts_still_tries_once() {
        let terminal = terminal().await;
        terminal.set_bars("EURUSD", bars(3)).await;

        let policy = RetryPolicy { attempts: 0, backoff: Duration::ZERO };
        let got = fetch_with_retry(&terminal, "EURUSD", Timeframe::M15, 100, policy)
            .await
            .unwrap();
        assert_eq!(got.len(), 3);
    }
}
