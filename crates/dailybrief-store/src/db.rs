use chrono::{DateTime, Utc};
use rusqlite::{Connection, Result, Row};

use dailybrief_core::types::DeliveryTime;

use crate::types::UserScheduleRecord;

/// Column list shared by every SELECT in this crate — keeps row_to_record
/// and the queries in sync.
pub(crate) const RECORD_COLUMNS: &str =
    "id, email, summary_email, delivery_hours, delivery_minutes, next_scheduled_run, \
     created_at, updated_at";

/// Map a SELECT row (column order from RECORD_COLUMNS) to a record.
pub(crate) fn row_to_record(row: &Row<'_>) -> Result<UserScheduleRecord> {
    let hours: Option<u8> = row.get(3)?;
    let minutes: Option<u8> = row.get(4)?;
    // Both columns are set or both are NULL — enforced by the CHECK clause.
    let delivery_time = match (hours, minutes) {
        (Some(hours), Some(minutes)) => Some(DeliveryTime { hours, minutes }),
        _ => None,
    };
    Ok(UserScheduleRecord {
        id: row.get(0)?,
        email: row.get(1)?,
        summary_email: row.get(2)?,
        delivery_time,
        next_scheduled_run: parse_instant(row.get::<_, Option<String>>(5)?),
        created_at: parse_instant(Some(row.get::<_, String>(6)?)).unwrap_or_else(Utc::now),
        updated_at: parse_instant(Some(row.get::<_, String>(7)?)).unwrap_or_else(Utc::now),
    })
}

fn parse_instant(raw: Option<String>) -> Option<DateTime<Utc>> {
    raw.and_then(|s| {
        DateTime::parse_from_rfc3339(&s)
            .ok()
            .map(|dt| dt.with_timezone(&Utc))
    })
}

/// Initialise the users table. Safe to call on every startup —
/// CREATE IF NOT EXISTS means it's idempotent.
pub fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS users (
            id                  TEXT    NOT NULL PRIMARY KEY,
            email               TEXT    NOT NULL UNIQUE,
            summary_email       TEXT    NOT NULL,
            delivery_hours      INTEGER,            -- NULL means unscheduled
            delivery_minutes    INTEGER,
            next_scheduled_run  TEXT,               -- ISO-8601 or NULL
            created_at          TEXT    NOT NULL,
            updated_at          TEXT    NOT NULL,
            CHECK ((delivery_hours IS NULL) = (delivery_minutes IS NULL))
        ) STRICT;

        -- Efficient sweep: SELECT … WHERE next_scheduled_run < ?
        CREATE INDEX IF NOT EXISTS idx_users_next_run ON users (next_scheduled_run);",
    )?;
    Ok(())
}
