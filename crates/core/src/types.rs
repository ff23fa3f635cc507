/// Caller-assigned asset identity key (an element's `id`).
pub type AssetId = String;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;
