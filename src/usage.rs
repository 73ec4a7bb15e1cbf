use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::clock::{Clock, SystemClock};
use crate::ip::ClientIp;
use crate::store::{KeyValueStore, StoreResult, USAGE_KEY};

pub const MAX_DAILY_LIMIT: u32 = 3;

/// Usage of the most recently seen IP on this device. Only one record exists;
/// `count` applies to `last_date` and is stale on any other day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageRecord {
    pub ip: String,
    pub count: u32,
    pub last_date: NaiveDate,
}

impl UsageRecord {
    fn count_for(&self, ip: &str, today: NaiveDate) -> u32 {
        if self.ip == ip && self.last_date == today {
            self.count
        } else {
            0
        }
    }
}

/// Soft daily quota keyed on the last IP seen by this device. Fails open on
/// every storage fault.
pub struct UsageLimiter<S, C = SystemClock> {
    store: S,
    clock: C,
    daily_limit: u32,
}

impl<S: KeyValueStore> UsageLimiter<S> {
    pub fn new(store: S) -> Self {
        Self::with_clock(store, SystemClock)
    }
}

impl<S: KeyValueStore, C: Clock> UsageLimiter<S, C> {
    pub fn with_clock(store: S, clock: C) -> Self {
        Self {
            store,
            clock,
            daily_limit: MAX_DAILY_LIMIT,
        }
    }

    pub fn with_daily_limit(mut self, daily_limit: u32) -> Self {
        self.daily_limit = daily_limit;
        self
    }

    pub fn daily_limit(&self) -> u32 {
        self.daily_limit
    }

    pub fn load_record(&self) -> StoreResult<Option<UsageRecord>> {
        match self.store.get(USAGE_KEY)? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    /// Analyses already used today by `ip`, or an error if the record is unreadable.
    fn used_today(&self, ip: &ClientIp) -> StoreResult<u32> {
        let ClientIp::Known(ip) = ip else {
            return Ok(0);
        };
        let today = self.clock.today();
        Ok(self
            .load_record()?
            .map(|record| record.count_for(ip, today))
            .unwrap_or(0))
    }

    pub fn check_limit(&self, ip: &ClientIp) -> bool {
        if ip.is_unknown() {
            return true;
        }
        match self.used_today(ip) {
            Ok(used) => used < self.daily_limit,
            Err(e) => {
                warn!(action = "check", component = "usage_limiter", error = %e, "Usage record unreadable, allowing");
                true
            }
        }
    }

    pub fn remaining(&self, ip: &ClientIp) -> u32 {
        match self.used_today(ip) {
            Ok(used) => self.daily_limit.saturating_sub(used),
            Err(e) => {
                warn!(action = "remaining", component = "usage_limiter", error = %e, "Usage record unreadable, reporting full quota");
                self.daily_limit
            }
        }
    }

    /// Returns the record written, or `None` for an unknown IP.
    pub fn try_record_usage(&self, ip: &ClientIp) -> StoreResult<Option<UsageRecord>> {
        let ClientIp::Known(ip) = ip else {
            return Ok(None);
        };
        let today = self.clock.today();

        let previous = match self.load_record() {
            Ok(previous) => previous,
            Err(e) => {
                warn!(action = "record", component = "usage_limiter", error = %e, "Discarding unreadable usage record");
                None
            }
        };
        let count = previous
            .map(|record| record.count_for(ip, today))
            .unwrap_or(0)
            .saturating_add(1);

        let record = UsageRecord {
            ip: ip.clone(),
            count,
            last_date: today,
        };
        let encoded = serde_json::to_string(&record)?;
        self.store.set(USAGE_KEY, &encoded)?;

        info!(action = "record", component = "usage_limiter", ip = %record.ip, count = record.count, date = %record.last_date, "Usage recorded");
        Ok(Some(record))
    }

    pub fn record_usage(&self, ip: &ClientIp) {
        if let Err(e) = self.try_record_usage(ip) {
            warn!(action = "record", component = "usage_limiter", error = %e, "Failed to save IP usage");
        }
    }

    pub fn try_reset_usage(&self) -> StoreResult<()> {
        self.store.delete(USAGE_KEY)?;
        info!(action = "reset", component = "usage_limiter", "Usage record cleared");
        Ok(())
    }

    pub fn reset_usage(&self) {
        if let Err(e) = self.try_reset_usage() {
            warn!(action = "reset", component = "usage_limiter", error = %e, "Failed to reset IP usage");
        }
    }
}
