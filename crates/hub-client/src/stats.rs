//! Follower counts bucketed by relation age.

use chrono::{DateTime, Duration, Months, Utc};
use serde::Serialize;

use hub_shared::models::FollowerRelation;

/// Counts over the followers mirror. Buckets overlap: a relation created
/// today counts toward today, the week and the month.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FollowerStats {
    pub total_followers: usize,
    pub new_followers_today: usize,
    pub new_followers_week: usize,
    pub new_followers_month: usize,
}

/// Lower bounds of the three buckets, all inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatsWindow {
    /// Midnight UTC of the current day.
    pub today: DateTime<Utc>,
    /// Seven elapsed days before now.
    pub week: DateTime<Utc>,
    /// One calendar month before now, clamped to the last day of a
    /// shorter month.
    pub month: DateTime<Utc>,
}

impl StatsWindow {
    pub fn at(now: DateTime<Utc>) -> Self {
        let today = now
            .date_naive()
            .and_hms_opt(0, 0, 0)
            .map(|midnight| midnight.and_utc())
            .unwrap_or(now);

        Self {
            today,
            week: now - Duration::days(7),
            month: now.checked_sub_months(Months::new(1)).unwrap_or(DateTime::<Utc>::MIN_UTC),
        }
    }
}

impl FollowerStats {
    /// Full scan; cheap enough to redo after every change.
    pub fn compute(relations: &[FollowerRelation], now: DateTime<Utc>) -> Self {
        let window = StatsWindow::at(now);
        let mut stats = Self {
            total_followers: relations.len(),
            ..Self::default()
        };

        for rel in relations {
            if rel.created_at >= window.today {
                stats.new_followers_today += 1;
            }
            if rel.created_at >= window.week {
                stats.new_followers_week += 1;
            }
            if rel.created_at >= window.month {
                stats.new_followers_month += 1;
            }
        }
        stats
    }
}
