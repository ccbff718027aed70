mod model;

pub use model::{QuotaDecision, RateLimitInfo};

use chrono::{DateTime, NaiveDate, TimeDelta, Utc};
use teloxide::types::UserId;

use crate::{config::RateLimitConfig, storage::MemoryCache, utils::seconds_to_human_readable};

/// In-memory request guards: a fixed one-minute window for every user and a
/// daily search allowance for the free tier. Counters reset on restart.
#[derive(Clone)]
pub struct RateLimitService {
    minute_windows: MemoryCache<(UserId, i64), u32>,
    daily_searches: MemoryCache<(UserId, NaiveDate), u32>,
    per_minute: u32,
    free_daily_limit: u32,
}

impl RateLimitService {
    pub fn new(config: &RateLimitConfig) -> Self {
        info!(
            "Initializing rate limit service ({} per minute, {} free searches per day)",
            config.per_minute, config.free_daily_limit
        );
        Self {
            minute_windows: MemoryCache::new(256),
            daily_searches: MemoryCache::new(256),
            per_minute: config.per_minute,
            free_daily_limit: config.free_daily_limit,
        }
    }

    /// Counts one update against the user's current minute. False once over the limit.
    pub fn check_rate_limit(&self, user: UserId) -> bool {
        self.check_rate_limit_at(user, Utc::now())
    }

    /// Uses one of the free tier's daily searches if any is left.
    pub fn consume_free_search(&self, user: UserId) -> QuotaDecision {
        self.consume_free_search_at(user, Utc::now())
    }

    pub fn get_rate_limit_info(&self, user: UserId) -> RateLimitInfo {
        self.get_rate_limit_info_at(user, Utc::now())
    }

    fn check_rate_limit_at(&self, user: UserId, now: DateTime<Utc>) -> bool {
        let window = now.timestamp() / 60;
        self.minute_windows.retain(|(_, w), _| *w >= window);

        let count = self
            .minute_windows
            .update((user, window), |count| count.copied().unwrap_or(0).saturating_add(1));

        if count > self.per_minute {
            warn!("User {} exceeded {} requests per minute", user, self.per_minute);
            return false;
        }
        true
    }

    fn consume_free_search_at(&self, user: UserId, now: DateTime<Utc>) -> QuotaDecision {
        let today = now.date_naive();
        self.daily_searches.retain(|(_, day), _| *day >= today);

        let limit = self.free_daily_limit;
        let mut allowed = false;
        let used = self.daily_searches.update((user, today), |used| {
            let used = used.copied().unwrap_or(0);
            allowed = used < limit;
            if allowed {
                used + 1
            } else {
                used
            }
        });

        if allowed {
            QuotaDecision::Allowed { remaining: limit - used }
        } else {
            info!("User {} used all {} free searches today", user, limit);
            QuotaDecision::Exhausted { limit }
        }
    }

    fn get_rate_limit_info_at(&self, user: UserId, now: DateTime<Utc>) -> RateLimitInfo {
        let today = now.date_naive();
        let used_today = self.daily_searches.get(&(user, today)).unwrap_or(0);

        let next_midnight = (today + TimeDelta::days(1)).and_time(chrono::NaiveTime::MIN).and_utc();
        let until_reset = (next_midnight - now).num_seconds().max(0) as u64;

        RateLimitInfo {
            used_today,
            daily_limit: self.free_daily_limit,
            remaining_today: self.free_daily_limit.saturating_sub(used_today),
            reset_time: seconds_to_human_readable(until_reset),
        }
    }
}
