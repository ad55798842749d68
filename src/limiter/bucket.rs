//! Single-client token bucket
//!
//! Each client gets its own governor limiter. Governor implements the
//! token bucket as GCRA: a bucket of `burst` permits that refills one permit
//! every `1/rate` seconds, computed lazily from the clock on every check.
//! The limiter's state is a single atomic cell, so concurrent checks against
//! the same client never lose updates and different clients never contend.

use std::num::NonZeroU32;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use governor::{
    clock::{Clock, DefaultClock},
    middleware::StateInformationMiddleware,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter,
};
use nonzero_ext::nonzero;

type DirectLimiter<C> = RateLimiter<NotKeyed, InMemoryState, C, StateInformationMiddleware>;

/// Highest accepted refill rate (one permit per nanosecond)
const MAX_RATE_PER_SECOND: f64 = 1e9;

/// Refill rate and bucket size for one admission tier
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RatePolicy {
    /// Permits added per second
    pub rate: f64,
    /// Bucket capacity
    pub burst: u32,
}

impl RatePolicy {
    /// General API traffic
    pub const GENERAL: Self = Self { rate: 10.0, burst: 20 };
    /// Login and registration
    pub const SENSITIVE: Self = Self { rate: 3.0, burst: 5 };
    /// Video upload
    pub const UPLOAD: Self = Self { rate: 1.0, burst: 2 };

    pub fn new(rate: f64, burst: u32) -> Result<Self> {
        if !rate.is_finite() || rate <= 0.0 || rate > MAX_RATE_PER_SECOND {
            bail!("rate must be a positive number of permits per second, got {}", rate);
        }
        if burst == 0 {
            bail!("burst must be at least 1");
        }
        Ok(Self { rate, burst })
    }

    /// Parse the `rate/burst` form used in configuration, e.g. `10/20`
    pub fn parse(value: &str) -> Result<Self> {
        let (rate, burst) = value
            .split_once('/')
            .context("expected '<rate>/<burst>'")?;
        let rate: f64 = rate.trim().parse().context("rate is not a number")?;
        let burst: u32 = burst.trim().parse().context("burst is not an integer")?;
        Self::new(rate, burst)
    }

    /// Time for one permit to refill
    pub fn replenish_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.rate).max(Duration::from_nanos(1))
    }

    fn quota(&self) -> Quota {
        let burst = NonZeroU32::new(self.burst).unwrap_or(nonzero!(1u32));
        Quota::with_period(self.replenish_interval())
            .unwrap_or_else(|| Quota::per_second(nonzero!(1u32)))
            .allow_burst(burst)
    }
}

/// Outcome of a single admission check
#[derive(Debug, Clone, PartialEq)]
pub struct RateLimitResult {
    /// Whether a permit was taken
    pub allowed: bool,
    /// Bucket capacity
    pub limit: u32,
    /// Permits left after this check
    pub remaining: u32,
    /// How long until the next permit, zero when allowed
    pub retry_after: Duration,
}

/// Token bucket for one client identifier
pub struct ClientLimiter<C: Clock = DefaultClock> {
    inner: DirectLimiter<C>,
    clock: C,
    policy: RatePolicy,
}

impl ClientLimiter<DefaultClock> {
    /// Create a limiter on the wall clock; the bucket starts full
    pub fn new(policy: RatePolicy) -> Self {
        Self::with_clock(policy, DefaultClock::default())
    }
}

impl<C: Clock> ClientLimiter<C> {
    /// Create a limiter reading time from `clock`; the bucket starts full
    pub fn with_clock(policy: RatePolicy, clock: C) -> Self {
        let inner = RateLimiter::direct_with_clock(policy.quota(), &clock)
            .with_middleware::<StateInformationMiddleware>();
        Self {
            inner,
            clock,
            policy,
        }
    }

    /// Take one permit if available
    pub fn allow(&self) -> bool {
        self.check().allowed
    }

    /// Take one permit if available, reporting the bucket state
    pub fn check(&self) -> RateLimitResult {
        match self.inner.check() {
            Ok(snapshot) => RateLimitResult {
                allowed: true,
                limit: self.policy.burst,
                remaining: snapshot.remaining_burst_capacity(),
                retry_after: Duration::ZERO,
            },
            Err(not_until) => RateLimitResult {
                allowed: false,
                limit: self.policy.burst,
                remaining: 0,
                retry_after: not_until.wait_time_from(self.clock.now()),
            },
        }
    }

    pub fn policy(&self) -> RatePolicy {
        self.policy
    }
}
