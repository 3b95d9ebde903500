use std::fmt;

use chrono::{DateTime, Duration, FixedOffset, Timelike, Utc};

/// All wall-clock rules evaluate in IST (UTC+5:30).
pub fn ist() -> FixedOffset {
    FixedOffset::east_opt(5 * 3600 + 30 * 60).expect("UTC+5:30 is a valid offset")
}

/// Inclusive clock-time interval in IST. Both endpoints are inside the
/// window: 10:30:00 passes a window ending 10:30, 10:30:01 does not.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    start_hour: u32,
    start_min: u32,
    end_hour: u32,
    end_min: u32,
}

/// Zero-follow users may post only inside this window.
pub const ZERO_FOLLOW_POSTING: TimeWindow = TimeWindow::new(10, 0, 10, 30);
/// Subscription payments are accepted only inside this window.
pub const PAYMENT: TimeWindow = TimeWindow::new(10, 0, 11, 0);
/// Audio uploads are accepted only inside this window.
pub const AUDIO_UPLOAD: TimeWindow = TimeWindow::new(14, 0, 19, 0);

impl TimeWindow {
    pub const fn new(start_hour: u32, start_min: u32, end_hour: u32, end_min: u32) -> Self {
        Self {
            start_hour,
            start_min,
            end_hour,
            end_min,
        }
    }

    pub fn contains(&self, now: DateTime<Utc>) -> bool {
        let secs = now.with_timezone(&ist()).time().num_seconds_from_midnight();
        let start = (self.start_hour * 60 + self.start_min) * 60;
        let end = (self.end_hour * 60 + self.end_min) * 60;
        start <= secs && secs <= end
    }
}

impl fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02}:{:02}-{:02}:{:02} IST",
            self.start_hour, self.start_min, self.end_hour, self.end_min
        )
    }
}

/// UTC half-open range `[start, end)` covering the IST calendar day that
/// `now` falls in. Used to count a user's posts "today".
pub fn ist_day_bounds(now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
    let tz = ist();
    let midnight = now
        .with_timezone(&tz)
        .date_naive()
        .and_hms_opt(0, 0, 0)
        .expect("midnight is a valid time")
        .and_local_timezone(tz)
        .single()
        .expect("fixed offsets have no DST gaps");
    let start = midnight.with_timezone(&Utc);
    (start, start + Duration::days(1))
}
