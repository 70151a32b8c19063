use chrono::{DateTime, Utc};
use serde::Serialize;

/// Client-side notice raised when an order changes status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: u64,
    pub message: String,
    pub created_at: DateTime<Utc>,
    pub read: bool,
}

impl Notification {
    pub(crate) fn new(id: u64, message: String, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            message,
            created_at,
            read: false,
        }
    }

    /// Coarse age of the notification relative to `now`.
    pub fn relative_time(&self, now: DateTime<Utc>) -> String {
        let elapsed = now.signed_duration_since(self.created_at);
        let minutes = elapsed.num_minutes();
        let hours = elapsed.num_hours();
        let days = elapsed.num_days();

        if minutes < 1 {
            "just now".to_string()
        } else if minutes < 60 {
            plural(minutes, "minute")
        } else if hours < 24 {
            plural(hours, "hour")
        } else {
            plural(days, "day")
        }
    }
}

fn plural(count: i64, unit: &str) -> String {
    if count == 1 {
        format!("1 {unit} ago")
    } else {
        format!("{count} {unit}s ago")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn at(created_at: DateTime<Utc>) -> Notification {
        Notification::new(1, "Order ORD-1 is now in transit".to_string(), created_at)
    }

    #[test]
    fn test_relative_time_buckets() {
        let now = Utc.with_ymd_and_hms(2024, 11, 15, 12, 0, 0).unwrap();

        assert_eq!(at(now).relative_time(now), "just now");
        assert_eq!(at(now - Duration::seconds(59)).relative_time(now), "just now");
        assert_eq!(at(now - Duration::minutes(1)).relative_time(now), "1 minute ago");
        assert_eq!(at(now - Duration::minutes(45)).relative_time(now), "45 minutes ago");
        assert_eq!(at(now - Duration::hours(1)).relative_time(now), "1 hour ago");
        assert_eq!(at(now - Duration::hours(23)).relative_time(now), "23 hours ago");
        assert_eq!(at(now - Duration::days(3)).relative_time(now), "3 days ago");
    }

    #[test]
    fn test_clock_skew_reads_as_just_now() {
        let now = Utc.with_ymd_and_hms(2024, 11, 15, 12, 0, 0).unwrap();

        assert_eq!(at(now + Duration::minutes(5)).relative_time(now), "just now");
    }

    #[test]
    fn test_new_notification_is_unread() {
        let notification = at(Utc::now());

        assert!(!notification.read);
        assert_eq!(notification.id, 1);
    }
}
