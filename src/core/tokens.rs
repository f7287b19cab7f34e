use chrono::{DateTime, Utc};

/// Whether a download token has passed its expiry instant
pub fn token_expired(expires_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    expires_at <= now
}

/// Downloads left on a token, never negative
pub fn remaining_downloads(max_downloads: i32, download_count: i32) -> i32 {
    (max_downloads - download_count).max(0)
}

/// Row-count rate limit: a request is allowed while the count of events in
/// the window is strictly below the cap.
pub fn window_allows(count_in_window: i64, cap: i64) -> bool {
    count_in_window < cap
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_token_expiry_boundary() {
        let now = Utc::now();
        assert!(token_expired(now - Duration::seconds(1), now));
        // Exactly at the expiry instant counts as expired
        assert!(token_expired(now, now));
        assert!(!token_expired(now + Duration::seconds(1), now));
    }

    #[test]
    fn test_remaining_downloads() {
        assert_eq!(remaining_downloads(5, 0), 5);
        assert_eq!(remaining_downloads(5, 5), 0);
        assert_eq!(remaining_downloads(5, 7), 0);
    }

    #[test]
    fn test_window_boundary() {
        assert!(window_allows(0, 20));
        assert!(window_allows(19, 20));
        // count == cap means the window is full
        assert!(!window_allows(20, 20));
        assert!(!window_allows(21, 20));
    }

    #[test]
    fn test_zero_cap_blocks_everything() {
        assert!(!window_allows(0, 0));
    }
}
