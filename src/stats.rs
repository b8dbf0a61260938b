// src/stats.rs

use crate::error::StoreError;
use crate::storage::{LAST_RESET_KEY, STATS_KEY, StoragePort};
use serde::{Deserialize, Serialize};
use time::Date;
use time::macros::format_description;
use tracing::{info, warn};

pub const DEFAULT_MINUTES_SAVED: u64 = 15;

/// Running usage counters, persisted under `stats`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsCounters {
    #[serde(rename = "total")]
    pub total_processed: u64,
    #[serde(rename = "today")]
    pub processed_today: u64,
    #[serde(rename = "timesSaved")]
    pub cumulative_minutes_saved: u64,
}

pub struct StatsAggregator<P> {
    port: P,
    counters: StatsCounters,
    minutes_per_invoice: u64,
}

impl<P: StoragePort> StatsAggregator<P> {
    pub fn load(port: P, minutes_per_invoice: u64) -> Result<Self, StoreError> {
        let counters = match port.get(STATS_KEY)? {
            None => StatsCounters::default(),
            Some(raw) => serde_json::from_str(&raw).map_err(|source| StoreError::Corrupt {
                key: STATS_KEY,
                source,
            })?,
        };

        Ok(Self {
            port,
            counters,
            minutes_per_invoice,
        })
    }

    pub fn counters(&self) -> StatsCounters {
        self.counters
    }

    /// Count one confirmed invoice and persist immediately.
    /// On a failed write the counters are restored to their previous values.
    pub fn record_processed(&mut self) -> Result<StatsCounters, StoreError> {
        let previous = self.counters;
        self.counters.total_processed += 1;
        self.counters.processed_today += 1;
        self.counters.cumulative_minutes_saved += self.minutes_per_invoice;

        if let Err(e) = self.persist() {
            self.counters = previous;
            warn!(error = %e, "Stats not stored, rolled back");
            return Err(e);
        }

        info!(
            total = self.counters.total_processed,
            today = self.counters.processed_today,
            minutes_saved = self.counters.cumulative_minutes_saved,
            "Stats updated"
        );
        Ok(self.counters)
    }

    /// Reset the daily counter when the `lastReset` marker is not today.
    ///
    /// `created_today` is the number of stored records confirmed today; the
    /// daily counter is re-derived from it rather than zeroed blindly.
    /// Returns whether a rollover happened.
    pub fn check_daily_rollover(
        &mut self,
        today: Date,
        created_today: u64,
    ) -> Result<bool, StoreError> {
        let marker = reset_marker(today)?;
        if self.port.get(LAST_RESET_KEY)?.as_deref() == Some(marker.as_str()) {
            return Ok(false);
        }

        self.counters.processed_today = created_today.min(self.counters.total_processed);
        self.persist()?;
        self.port.set(LAST_RESET_KEY, &marker)?;

        info!(
            marker = %marker,
            today = self.counters.processed_today,
            "Daily counter reset"
        );
        Ok(true)
    }

    fn persist(&self) -> Result<(), StoreError> {
        let json = serde_json::to_string(&self.counters).map_err(|source| {
            StoreError::Serialize {
                key: STATS_KEY,
                source,
            }
        })?;
        self.port.set(STATS_KEY, &json)?;
        Ok(())
    }
}

/// `Mon Jan 01 2024`, the format of the `lastReset` marker.
pub fn reset_marker(day: Date) -> Result<String, time::error::Format> {
    day.format(format_description!(
        "[weekday repr:short] [month repr:short] [day] [year]"
    ))
}

/// `2h 15m`, or just `45m` under an hour.
pub fn format_time_saved(minutes: u64) -> String {
    let hours = minutes / 60;
    let minutes = minutes % 60;
    if hours > 0 {
        format!("{hours}h {minutes}m")
    } else {
        format!("{minutes}m")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StorageError;
    use crate::storage::MemoryStorage;
    use time::macros::date;

    #[test]
    fn test_reset_marker_format() {
        assert_eq!(reset_marker(date!(2024 - 01 - 01)).unwrap(), "Mon Jan 01 2024");
    }

    #[test]
    fn test_format_time_saved() {
        assert_eq!(format_time_saved(0), "0m");
        assert_eq!(format_time_saved(45), "45m");
        assert_eq!(format_time_saved(60), "1h 0m");
        assert_eq!(format_time_saved(135), "2h 15m");
    }

    #[test]
    fn test_counters_use_persisted_layout() {
        let counters = StatsCounters {
            total_processed: 3,
            processed_today: 1,
            cumulative_minutes_saved: 45,
        };
        let json = serde_json::to_string(&counters).unwrap();
        assert_eq!(json, r#"{"total":3,"today":1,"timesSaved":45}"#);
        assert_eq!(serde_json::from_str::<StatsCounters>(&json).unwrap(), counters);
    }

    #[test]
    fn test_record_processed_increments_and_persists() {
        let storage = MemoryStorage::default();
        let mut stats = StatsAggregator::load(&storage, DEFAULT_MINUTES_SAVED).unwrap();

        for _ in 0..3 {
            stats.record_processed().unwrap();
        }

        let reloaded = StatsAggregator::load(&storage, DEFAULT_MINUTES_SAVED).unwrap();
        assert_eq!(
            reloaded.counters(),
            StatsCounters {
                total_processed: 3,
                processed_today: 3,
                cumulative_minutes_saved: 45,
            }
        );
    }

    #[test]
    fn test_rollover_resets_today_only() {
        let storage = MemoryStorage::default();
        let mut stats = StatsAggregator::load(&storage, DEFAULT_MINUTES_SAVED).unwrap();

        assert!(stats.check_daily_rollover(date!(2024 - 01 - 01), 0).unwrap());
        stats.record_processed().unwrap();
        stats.record_processed().unwrap();

        // Same day: marker matches, nothing changes.
        let mut same_day = StatsAggregator::load(&storage, DEFAULT_MINUTES_SAVED).unwrap();
        assert!(!same_day.check_daily_rollover(date!(2024 - 01 - 01), 2).unwrap());
        assert_eq!(same_day.counters().processed_today, 2);

        let mut next_day = StatsAggregator::load(&storage, DEFAULT_MINUTES_SAVED).unwrap();
        assert!(next_day.check_daily_rollover(date!(2024 - 01 - 02), 0).unwrap());
        assert_eq!(next_day.counters().processed_today, 0);
        assert_eq!(next_day.counters().total_processed, 2);
        assert_eq!(
            storage.get(LAST_RESET_KEY).unwrap().as_deref(),
            Some("Tue Jan 02 2024")
        );
    }

    #[test]
    fn test_rollover_never_exceeds_total() {
        let storage = MemoryStorage::default();
        let mut stats = StatsAggregator::load(&storage, DEFAULT_MINUTES_SAVED).unwrap();
        stats.record_processed().unwrap();

        stats.check_daily_rollover(date!(2024 - 01 - 02), 7).unwrap();
        let counters = stats.counters();
        assert!(counters.processed_today <= counters.total_processed);
    }

    struct ReadOnly;

    impl StoragePort for ReadOnly {
        fn get(&self, _key: &str) -> Result<Option<String>, StorageError> {
            Ok(None)
        }

        fn set(&self, _key: &str, _value: &str) -> Result<(), StorageError> {
            Err(std::io::Error::other("read-only").into())
        }

        fn remove(&self, _key: &str) -> Result<(), StorageError> {
            Err(std::io::Error::other("read-only").into())
        }
    }

    #[test]
    fn test_failed_write_restores_counters() {
        let mut stats = StatsAggregator::load(ReadOnly, DEFAULT_MINUTES_SAVED).unwrap();

        assert!(stats.record_processed().is_err());
        assert_eq!(stats.counters(), StatsCounters::default());
    }

    #[test]
    fn test_malformed_stats_is_corrupt() {
        let storage = MemoryStorage::default();
        storage.set(STATS_KEY, "total=3").unwrap();
        let err = StatsAggregator::load(&storage, DEFAULT_MINUTES_SAVED).err().unwrap();
        assert!(matches!(err, StoreError::Corrupt { key: STATS_KEY, .. }));
    }
}
