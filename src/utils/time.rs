//! Output timestamp formatting.

/// Serialize a `DateTime<Utc>` as `dd-MM-yyyy HH:mm:ss` (UTC), the wire
/// format used by every response body.
pub mod datetime_ddmmyyyy {
    use chrono::{DateTime, Utc};
    use serde::Serializer;

    const FORMAT: &str = "%d-%m-%Y %H:%M:%S";

    pub fn serialize<S>(dt: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&dt.format(FORMAT).to_string())
    }
}
