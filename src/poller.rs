//! Poll loop: fetch, normalize and store on a fixed interval

use std::time::Duration;

use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::{
    config::{PollModeKind, PollerConfig, RetryConfig},
    errors::Result,
    fetcher::PositionSource,
    models::NormalizedPosition,
    normalizer,
    sink::PositionSink,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollMode {
    /// Exactly one cycle, no retries
    Once,
    /// Unbounded cycles separated by a fixed sleep
    Continuous { interval: Duration },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollState {
    Idle,
    Fetching,
    Normalizing,
    Persisting,
    Sleeping,
    Done,
    Failed,
}

/// How many failed cycles in a row continuous mode tolerates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_consecutive_failures: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl RetryPolicy {
    /// First failure stops the loop
    pub fn fail_fast() -> Self {
        Self {
            max_consecutive_failures: 0,
            initial_backoff: Duration::ZERO,
            max_backoff: Duration::ZERO,
        }
    }

    /// Delay before retrying after `failures` consecutive failures (>= 1)
    pub fn backoff(&self, failures: u32) -> Duration {
        let factor = 1u32
            .checked_shl(failures.saturating_sub(1))
            .unwrap_or(u32::MAX);
        self.initial_backoff
            .saturating_mul(factor)
            .min(self.max_backoff)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::fail_fast()
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            max_consecutive_failures: config.max_consecutive_failures,
            initial_backoff: config.initial_backoff,
            max_backoff: config.max_backoff,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Cycles attempted, failed ones included
    pub cycles: u64,
    /// Positions handed to the sink successfully
    pub stored: u64,
}

/// Sequential poller over a source and a sink
///
/// Cycles never overlap: the next fetch starts only after the previous
/// store returned and the sleep elapsed.
pub struct Poller<S> {
    source: S,
    sink: Box<dyn PositionSink>,
    mode: PollMode,
    retry: RetryPolicy,
    max_cycles: Option<u64>,
    state: PollState,
}

impl<S: PositionSource> Poller<S> {
    pub fn new(source: S, sink: Box<dyn PositionSink>, mode: PollMode) -> Self {
        Self {
            source,
            sink,
            mode,
            retry: RetryPolicy::default(),
            max_cycles: None,
            state: PollState::Idle,
        }
    }

    pub fn from_config(source: S, sink: Box<dyn PositionSink>, config: &PollerConfig) -> Self {
        let mode = match config.mode {
            PollModeKind::Once => PollMode::Once,
            PollModeKind::Continuous => PollMode::Continuous {
                interval: config.interval,
            },
        };
        Self::new(source, sink, mode)
            .with_retry((&config.retry).into())
            .with_max_cycles(config.max_cycles)
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Stop continuous mode after `max_cycles` cycles
    ///
    /// At least one cycle always runs.
    pub fn with_max_cycles(mut self, max_cycles: Option<u64>) -> Self {
        self.max_cycles = max_cycles;
        self
    }

    pub fn state(&self) -> PollState {
        self.state
    }

    fn transition(&mut self, state: PollState) {
        debug!(from = ?self.state, to = ?state, "Poll state");
        self.state = state;
    }

    /// One fetch → normalize → store cycle
    pub async fn run_cycle(&mut self) -> Result<NormalizedPosition> {
        self.transition(PollState::Fetching);
        let raw = self.source.fetch().await?;

        self.transition(PollState::Normalizing);
        let position = normalizer::normalize(&raw)?;

        self.transition(PollState::Persisting);
        self.sink.store(&position).await?;

        info!(sink = self.sink.name(), "Stored position {}", position);
        Ok(position)
    }

    /// Run according to the configured mode
    ///
    /// Returns on the first failure unless the retry policy allows more;
    /// in continuous mode without `max_cycles` it only returns on failure.
    pub async fn run(&mut self) -> Result<RunSummary> {
        let mut summary = RunSummary::default();
        let mut failures = 0u32;

        loop {
            summary.cycles += 1;
            let limit_reached = self.max_cycles.is_some_and(|max| summary.cycles >= max);

            let delay = match self.run_cycle().await {
                Ok(_) => {
                    summary.stored += 1;
                    failures = 0;
                    match self.mode {
                        PollMode::Continuous { interval } if !limit_reached => interval,
                        _ => {
                            self.transition(PollState::Done);
                            return Ok(summary);
                        }
                    }
                }
                Err(e) => {
                    self.transition(PollState::Failed);
                    failures += 1;
                    // A run never ends in success on a failed cycle
                    if self.mode == PollMode::Once
                        || limit_reached
                        || failures > self.retry.max_consecutive_failures
                    {
                        return Err(e);
                    }
                    let backoff = self.retry.backoff(failures);
                    warn!(
                        stage = %e.stage(),
                        failures,
                        "Poll cycle failed, retrying in {:?}: {}",
                        backoff,
                        e
                    );
                    backoff
                }
            };

            self.transition(PollState::Sleeping);
            info!("Sleeping for {:?}...", delay);
            sleep(delay).await;
        }
    }

    /// Release the sink
    pub async fn close(&mut self) {
        self.sink.close().await;
    }
}
