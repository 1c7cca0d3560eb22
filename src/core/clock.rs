use chrono::{DateTime, Duration, TimeZone, Utc};
use kerberos_asn1::KerberosTime;

/// Local view of the KDC time. The offset is learned from the KDC replies
/// when time synchronization is enabled.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Clock {
    offset: Duration,
}

impl Clock {
    pub fn new() -> Self {
        return Self::with_offset(Duration::zero());
    }

    pub fn with_offset(offset: Duration) -> Self {
        return Self { offset };
    }

    pub fn offset(&self) -> Duration {
        return self.offset;
    }

    pub fn set_offset(&mut self, offset: Duration) {
        self.offset = offset;
    }

    /// Current time, corrected with the KDC offset
    pub fn now(&self) -> DateTime<Utc> {
        return Utc::now() + self.offset;
    }
}

impl Default for Clock {
    fn default() -> Self {
        return Self::new();
    }
}

pub fn krb_time_to_utc(time: &KerberosTime) -> DateTime<Utc> {
    return time.with_timezone(&Utc);
}

/// Kerberos times have no sub-second precision.
pub fn truncate_to_seconds(time: DateTime<Utc>) -> DateTime<Utc> {
    return Utc.timestamp(time.timestamp(), 0);
}

pub fn in_clock_skew(
    time: DateTime<Utc>,
    now: DateTime<Utc>,
    clockskew: Duration,
) -> bool {
    let diff = time.signed_duration_since(now);
    return diff <= clockskew && diff >= -clockskew;
}
