use chrono::{DateTime, Utc};

/// Single clock read per evaluation run; every row written by one run
/// carries the same timestamp.
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

pub fn to_rfc3339(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339()
}
