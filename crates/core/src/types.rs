/// Backend primary keys (achievements, progress rows, users).
pub type DbId = i64;

/// Achievement identifiers share the backend key space.
pub type AchievementId = DbId;

/// Resource keys are the camelCase identifiers used by the cost tables
/// (e.g. `basicPart`, `estokBlueprint`).
pub type ResourceKey = String;

/// Ship names as they appear in the catalog.
pub type ShipName = String;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;
