use chrono::{SecondsFormat, Utc};

/// Returns the current wall-clock time as an RFC 3339 string with
/// nanosecond precision.
///
/// Records treat the timestamp as an opaque ordering token: it is hashed and
/// displayed, never parsed back.
pub fn current_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Nanos, true)
}
