// src/database/models.rs
use chrono::{DateTime, Utc};

use crate::{
    errors::IssRecorderError,
    models::{NormalizedPosition, StoredRecord},
};

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct PositionRow {
    timestamp: DateTime<Utc>,
    position: String, // WKT, exactly as received
}

impl TryFrom<PositionRow> for StoredRecord {
    type Error = IssRecorderError;

    fn try_from(row: PositionRow) -> Result<Self, Self::Error> {
        Ok(StoredRecord {
            timestamp: row.timestamp,
            position: NormalizedPosition::from_wkt(&row.position)?,
        })
    }
}
