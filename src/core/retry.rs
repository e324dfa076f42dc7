use std::collections::BTreeSet;
use std::ops::RangeInclusive;
use std::time::Duration;

use rand::RngExt;

use crate::error::{ServiceError, TransportErrorKind};

pub const DEFAULT_MAX_RETRIES: usize = 3;
const DEFAULT_BASE_SCALE: Duration = Duration::from_millis(300);
const DEFAULT_THROTTLED_SCALE_MS: RangeInclusive<u64> = 500..=599;
const DEFAULT_MAX_BACKOFF: Duration = Duration::from_secs(20);
const THROTTLING_ERROR_CODE: &str = "Throttling";

/// A failed attempt, as seen by the retry policy.
#[derive(Clone, Copy, Debug)]
pub enum RetryFailure<'a> {
    Transport(TransportErrorKind),
    Service(&'a ServiceError),
}

/// Retry bookkeeping for one `execute` call.
///
/// Each loop iteration receives the state by value and produces the next one;
/// nothing else carries information between attempts.
#[derive(Clone, Debug, Default)]
pub struct RetryState {
    attempts: usize,
    last_error: Option<ServiceError>,
}

impl RetryState {
    pub fn initial() -> Self {
        Self::default()
    }

    /// Attempts already dispatched.
    pub fn attempts(&self) -> usize {
        self.attempts
    }

    /// The service error of the previous attempt, if that attempt produced one.
    pub fn last_error(&self) -> Option<&ServiceError> {
        self.last_error.as_ref()
    }

    pub fn is_first_attempt(&self) -> bool {
        self.attempts == 0
    }

    pub(crate) fn next(self, last_error: Option<ServiceError>) -> Self {
        Self {
            attempts: self.attempts.saturating_add(1),
            last_error,
        }
    }
}

#[derive(Clone, Debug)]
pub struct RetryPolicy {
    max_retries: usize,
    base_scale: Duration,
    throttled_scale_ms: RangeInclusive<u64>,
    max_backoff: Duration,
    retryable_status_codes: BTreeSet<u16>,
    throttling_error_codes: BTreeSet<String>,
    retryable_transport_error_kinds: BTreeSet<TransportErrorKind>,
}

impl RetryPolicy {
    pub fn disabled() -> Self {
        Self {
            max_retries: 0,
            ..Self::standard()
        }
    }

    pub fn standard() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            base_scale: DEFAULT_BASE_SCALE,
            throttled_scale_ms: DEFAULT_THROTTLED_SCALE_MS,
            max_backoff: DEFAULT_MAX_BACKOFF,
            retryable_status_codes: default_retryable_status_codes(),
            throttling_error_codes: default_throttling_error_codes(),
            retryable_transport_error_kinds: default_retryable_transport_error_kinds(),
        }
    }

    pub fn max_retries(mut self, max_retries: usize) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn base_scale(mut self, base_scale: Duration) -> Self {
        self.base_scale = base_scale;
        self
    }

    /// Scale factor range sampled after a throttling error. Clients sharing a
    /// throttle land on different delays.
    pub fn throttled_scale_range(mut self, low: Duration, high: Duration) -> Self {
        let low_ms = duration_millis(low);
        let high_ms = duration_millis(high).max(low_ms);
        self.throttled_scale_ms = low_ms..=high_ms;
        self
    }

    pub fn max_backoff(mut self, max_backoff: Duration) -> Self {
        self.max_backoff = max_backoff;
        self
    }

    pub fn retryable_status_codes(mut self, codes: impl IntoIterator<Item = u16>) -> Self {
        self.retryable_status_codes = codes.into_iter().collect();
        self
    }

    pub fn throttling_error_codes<S>(mut self, codes: impl IntoIterator<Item = S>) -> Self
    where
        S: Into<String>,
    {
        self.throttling_error_codes = codes.into_iter().map(Into::into).collect();
        self
    }

    pub fn retryable_transport_error_kinds(
        mut self,
        kinds: impl IntoIterator<Item = TransportErrorKind>,
    ) -> Self {
        self.retryable_transport_error_kinds = kinds.into_iter().collect();
        self
    }

    pub fn configured_max_retries(&self) -> usize {
        self.max_retries
    }

    pub fn configured_max_backoff(&self) -> Duration {
        self.max_backoff
    }

    pub fn is_throttling(&self, error: &ServiceError) -> bool {
        error
            .error_code()
            .is_some_and(|code| self.throttling_error_codes.contains(code))
    }

    /// `attempts` is the number of attempts made so far, including the one
    /// that just failed.
    pub fn should_retry(&self, failure: RetryFailure<'_>, attempts: usize) -> bool {
        if attempts > self.max_retries {
            return false;
        }
        match failure {
            RetryFailure::Transport(kind) => self.retryable_transport_error_kinds.contains(&kind),
            RetryFailure::Service(error) => {
                self.retryable_status_codes.contains(&error.status_code)
                    || self.is_throttling(error)
            }
        }
    }

    /// `min(max_backoff, 2^attempts * scale)`, where the scale is sampled from
    /// the throttled range when the previous attempt was throttled.
    pub fn backoff_delay(&self, attempts: usize, last_error: Option<&ServiceError>) -> Duration {
        let scale_ms = match last_error {
            Some(error) if self.is_throttling(error) => self.sample_throttled_scale_ms(),
            _ => duration_millis(self.base_scale),
        };
        self.exponential_delay(attempts, scale_ms)
    }

    fn sample_throttled_scale_ms(&self) -> u64 {
        let mut rng = rand::rng();
        rng.random_range(self.throttled_scale_ms.clone())
    }

    fn exponential_delay(&self, attempts: usize, scale_ms: u64) -> Duration {
        let exponent = attempts.min(63) as u32;
        let multiplier = 1_u128 << exponent;
        let max_ms = self.max_backoff.as_millis();
        let delay_ms = (scale_ms as u128)
            .saturating_mul(multiplier)
            .min(max_ms)
            .min(u64::MAX as u128) as u64;
        Duration::from_millis(delay_ms)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::standard()
    }
}

fn duration_millis(duration: Duration) -> u64 {
    duration.as_millis().min(u64::MAX as u128) as u64
}

fn default_retryable_status_codes() -> BTreeSet<u16> {
    [500_u16, 503].into_iter().collect()
}

fn default_throttling_error_codes() -> BTreeSet<String> {
    [THROTTLING_ERROR_CODE.to_owned()].into_iter().collect()
}

fn default_retryable_transport_error_kinds() -> BTreeSet<TransportErrorKind> {
    [
        TransportErrorKind::Connect,
        TransportErrorKind::Read,
        TransportErrorKind::Timeout,
    ]
    .into_iter()
    .collect()
}
