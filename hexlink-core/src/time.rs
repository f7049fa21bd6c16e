use std::time::{SystemTime, UNIX_EPOCH};

/// Fixed TAI-UTC offset in seconds.
///
/// Leap-second tables are out of scope; the offset has been 37 s since 2017.
pub const TAI_MINUS_UTC: i64 = 37;

/// A TAI timestamp split into whole seconds and nanoseconds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Tai {
    /// Whole seconds since the Unix epoch, TAI.
    pub sec: i64,
    /// Nanoseconds past `sec`.
    pub nsec: i64,
}

impl Tai {
    /// The current time from the system UTC clock plus [`TAI_MINUS_UTC`].
    pub fn now() -> Self {
        let since_epoch = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();
        Self {
            sec: since_epoch.as_secs() as i64 + TAI_MINUS_UTC,
            nsec: i64::from(since_epoch.subsec_nanos()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn now_is_ahead_of_utc() {
        let utc_sec = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_secs() as i64;
        let tai = Tai::now();
        assert!(tai.sec - utc_sec >= TAI_MINUS_UTC - 1);
        assert!((0..1_000_000_000).contains(&tai.nsec));
    }
}
