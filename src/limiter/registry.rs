//! Per-identifier limiter registry
//!
//! Maps client identifiers to their own [`ClientLimiter`]. Lookups take the
//! shared lock; the write lock is only taken to insert a never-seen
//! identifier. The map is an LRU cache so that traffic from many distinct
//! clients cannot grow it without bound.

use std::num::NonZeroUsize;
use std::sync::{Arc, PoisonError, RwLock};

use governor::clock::{Clock, DefaultClock};
use lru::LruCache;
use nonzero_ext::nonzero;
use tracing::debug;

use super::bucket::{ClientLimiter, RateLimitResult, RatePolicy};

/// Identifier → limiter map for one admission tier
pub struct LimiterRegistry<C: Clock = DefaultClock> {
    tier: &'static str,
    policy: RatePolicy,
    clock: C,
    limiters: RwLock<LruCache<String, Arc<ClientLimiter<C>>>>,
}

impl LimiterRegistry<DefaultClock> {
    /// Create a registry on the wall clock holding at most `max_clients` entries
    pub fn new(tier: &'static str, policy: RatePolicy, max_clients: usize) -> Self {
        Self::with_clock(tier, policy, max_clients, DefaultClock::default())
    }
}

impl<C: Clock> LimiterRegistry<C> {
    /// Create a registry whose limiters read time from `clock`
    pub fn with_clock(tier: &'static str, policy: RatePolicy, max_clients: usize, clock: C) -> Self {
        let capacity = NonZeroUsize::new(max_clients).unwrap_or(nonzero!(1usize));
        Self {
            tier,
            policy,
            clock,
            limiters: RwLock::new(LruCache::new(capacity)),
        }
    }

    /// Return the limiter for `identifier`, creating it on first sight
    ///
    /// Two racing callers for the same new identifier both end up with the
    /// same limiter: the second re-checks under the write lock.
    pub fn get_limiter(&self, identifier: &str) -> Arc<ClientLimiter<C>> {
        {
            let limiters = self.limiters.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(limiter) = limiters.peek(identifier) {
                let limiter = Arc::clone(limiter);
                drop(limiters);
                self.touch(identifier);
                return limiter;
            }
        }

        let mut limiters = self.limiters.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(limiter) = limiters.get(identifier) {
            return Arc::clone(limiter);
        }

        let limiter = Arc::new(ClientLimiter::with_clock(self.policy, self.clock.clone()));
        if let Some((evicted, _)) = limiters.push(identifier.to_string(), Arc::clone(&limiter)) {
            debug!(tier = self.tier, evicted = %evicted, "Evicted least recently used client limiter");
        }
        debug!(tier = self.tier, client = %identifier, "Created client limiter");
        limiter
    }

    /// Take one permit for `identifier`
    pub fn allow(&self, identifier: &str) -> bool {
        self.get_limiter(identifier).allow()
    }

    /// Take one permit for `identifier`, reporting the bucket state
    pub fn check(&self, identifier: &str) -> RateLimitResult {
        self.get_limiter(identifier).check()
    }

    /// Number of identifiers currently tracked
    pub fn len(&self) -> usize {
        self.limiters
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Maximum number of identifiers tracked before eviction
    pub fn capacity(&self) -> usize {
        self.limiters
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .cap()
            .get()
    }

    pub fn tier(&self) -> &'static str {
        self.tier
    }

    pub fn policy(&self) -> RatePolicy {
        self.policy
    }

    // Recency is best effort: skip the promotion rather than wait for readers.
    fn touch(&self, identifier: &str) {
        if let Ok(mut limiters) = self.limiters.try_write() {
            limiters.promote(identifier);
        }
    }
}
