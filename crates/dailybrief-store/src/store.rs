use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use rusqlite::Connection;
use tracing::debug;

use dailybrief_core::types::DeliveryTime;

use crate::db::{row_to_record, RECORD_COLUMNS};
use crate::error::{Result, StoreError};
use crate::types::UserScheduleRecord;

/// SQLite-backed user schedule store.
///
/// Holds its own `Connection` behind a mutex so the scheduler, the sweep and
/// the HTTP surface can share one handle without conflicting.
#[derive(Clone)]
pub struct SqliteUserStore {
    db: Arc<Mutex<Connection>>,
}

impl SqliteUserStore {
    pub fn new(conn: Connection) -> Result<Self> {
        crate::db::init_db(&conn)?;
        Ok(Self {
            db: Arc::new(Mutex::new(conn)),
        })
    }

    /// All users that currently have a delivery-time preference —
    /// the set re-armed on every startup.
    pub fn find_users_with_delivery_time(&self) -> Result<Vec<UserScheduleRecord>> {
        let conn = self.db.lock().unwrap();
        let sql = format!("SELECT {RECORD_COLUMNS} FROM users WHERE delivery_hours IS NOT NULL");
        let mut stmt = conn.prepare(&sql)?;
        let records = stmt
            .query_map([], row_to_record)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(records)
    }

    pub fn find_user_by_id(&self, id: &str) -> Result<Option<UserScheduleRecord>> {
        let conn = self.db.lock().unwrap();
        let sql = format!("SELECT {RECORD_COLUMNS} FROM users WHERE id = ?1");
        let mut stmt = conn.prepare(&sql)?;
        let mut rows = stmt.query_map([id], row_to_record)?;
        match rows.next() {
            Some(record) => Ok(Some(record?)),
            None => Ok(None),
        }
    }

    /// Users whose persisted next-run marker has already elapsed — the
    /// missed-schedule set the recovery sweep drives through catch-up.
    /// Strictly less than `now`: a marker equal to now is still "on time".
    pub fn find_users_with_past_next_run(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Vec<UserScheduleRecord>> {
        let conn = self.db.lock().unwrap();
        let sql = format!(
            "SELECT {RECORD_COLUMNS} FROM users
             WHERE delivery_hours IS NOT NULL
               AND next_scheduled_run IS NOT NULL
               AND next_scheduled_run < ?1"
        );
        let mut stmt = conn.prepare(&sql)?;
        let records = stmt
            .query_map([now.to_rfc3339()], row_to_record)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(records)
    }

    /// Persist the engine's expected next fire instant (best-effort marker).
    pub fn save_next_run(&self, id: &str, next_run: Option<DateTime<Utc>>) -> Result<()> {
        let conn = self.db.lock().unwrap();
        let rows = conn.execute(
            "UPDATE users SET next_scheduled_run = ?2, updated_at = ?3 WHERE id = ?1",
            rusqlite::params![
                id,
                next_run.map(|dt| dt.to_rfc3339()),
                Utc::now().to_rfc3339()
            ],
        )?;
        if rows == 0 {
            return Err(StoreError::NotFound(id.to_string()));
        }
        debug!(user_id = %id, next_run = ?next_run, "persisted next run marker");
        Ok(())
    }

    /// Insert or replace a full record. Used by the preference boundary
    /// and by tests seeding fixtures.
    pub fn upsert_user(&self, record: &UserScheduleRecord) -> Result<()> {
        if let Some(dt) = record.delivery_time {
            dt.validate()
                .map_err(|e| StoreError::InvalidRecord(e.to_string()))?;
        }
        let conn = self.db.lock().unwrap();
        conn.execute(
            "INSERT INTO users
             (id, email, summary_email, delivery_hours, delivery_minutes,
              next_scheduled_run, created_at, updated_at)
             VALUES (?1,?2,?3,?4,?5,?6,?7,?8)
             ON CONFLICT(id) DO UPDATE SET
               email=excluded.email,
               summary_email=excluded.summary_email,
               delivery_hours=excluded.delivery_hours,
               delivery_minutes=excluded.delivery_minutes,
               next_scheduled_run=excluded.next_scheduled_run,
               updated_at=excluded.updated_at",
            rusqlite::params![
                record.id,
                record.email,
                record.summary_email,
                record.delivery_time.map(|dt| dt.hours),
                record.delivery_time.map(|dt| dt.minutes),
                record.next_scheduled_run.map(|dt| dt.to_rfc3339()),
                record.created_at.to_rfc3339(),
                record.updated_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Update only the delivery-time preference. `None` clears it and the
    /// next-run marker (the user becomes unscheduled).
    pub fn set_delivery_time(
        &self,
        id: &str,
        delivery_time: Option<DeliveryTime>,
    ) -> Result<UserScheduleRecord> {
        if let Some(dt) = delivery_time {
            dt.validate()
                .map_err(|e| StoreError::InvalidRecord(e.to_string()))?;
        }
        {
            let conn = self.db.lock().unwrap();
            let rows = conn.execute(
                "UPDATE users SET
                   delivery_hours = ?2,
                   delivery_minutes = ?3,
                   next_scheduled_run = CASE WHEN ?2 IS NULL THEN NULL
                                             ELSE next_scheduled_run END,
                   updated_at = ?4
                 WHERE id = ?1",
                rusqlite::params![
                    id,
                    delivery_time.map(|dt| dt.hours),
                    delivery_time.map(|dt| dt.minutes),
                    Utc::now().to_rfc3339()
                ],
            )?;
            if rows == 0 {
                return Err(StoreError::NotFound(id.to_string()));
            }
        }
        self.find_user_by_id(id)?
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    pub fn delete_user(&self, id: &str) -> Result<()> {
        let conn = self.db.lock().unwrap();
        let rows = conn.execute("DELETE FROM users WHERE id = ?1", [id])?;
        if rows == 0 {
            return Err(StoreError::NotFound(id.to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn memory_store() -> SqliteUserStore {
        SqliteUserStore::new(Connection::open_in_memory().unwrap()).unwrap()
    }

    fn seeded(id: &str, hours: u8, minutes: u8) -> UserScheduleRecord {
        UserScheduleRecord::new(id, format!("{id}@example.com"))
            .with_delivery_time(DeliveryTime { hours, minutes })
    }

    #[test]
    fn upsert_and_fetch_round_trip() {
        let store = memory_store();
        store.upsert_user(&seeded("u1", 18, 0)).unwrap();

        let user = store.find_user_by_id("u1").unwrap().unwrap();
        assert_eq!(user.email, "u1@example.com");
        assert_eq!(user.delivery_time, Some(DeliveryTime { hours: 18, minutes: 0 }));
        assert!(user.next_scheduled_run.is_none());
    }

    #[test]
    fn find_by_id_absent_is_none() {
        let store = memory_store();
        assert!(store.find_user_by_id("ghost").unwrap().is_none());
    }

    #[test]
    fn users_with_delivery_time_excludes_unscheduled() {
        let store = memory_store();
        store.upsert_user(&seeded("a", 8, 30)).unwrap();
        store
            .upsert_user(&UserScheduleRecord::new("b", "b@example.com"))
            .unwrap();

        let scheduled = store.find_users_with_delivery_time().unwrap();
        assert_eq!(scheduled.len(), 1);
        assert_eq!(scheduled[0].id, "a");
    }

    #[test]
    fn past_next_run_is_strictly_less_than_now() {
        let store = memory_store();
        let now = Utc::now();

        let mut missed = seeded("missed", 9, 0);
        missed.next_scheduled_run = Some(now - Duration::hours(2));
        store.upsert_user(&missed).unwrap();

        let mut future = seeded("future", 9, 0);
        future.next_scheduled_run = Some(now + Duration::hours(2));
        store.upsert_user(&future).unwrap();

        let mut exact = seeded("exact", 9, 0);
        exact.next_scheduled_run = Some(now);
        store.upsert_user(&exact).unwrap();

        let past = store.find_users_with_past_next_run(now).unwrap();
        assert_eq!(past.len(), 1);
        assert_eq!(past[0].id, "missed");
    }

    #[test]
    fn save_next_run_persists_marker() {
        let store = memory_store();
        store.upsert_user(&seeded("u1", 18, 0)).unwrap();

        let next = Utc::now() + Duration::hours(5);
        store.save_next_run("u1", Some(next)).unwrap();

        let user = store.find_user_by_id("u1").unwrap().unwrap();
        let stored = user.next_scheduled_run.unwrap();
        assert!((stored - next).num_seconds().abs() < 1);
    }

    #[test]
    fn save_next_run_unknown_user_errors() {
        let store = memory_store();
        assert!(matches!(
            store.save_next_run("ghost", None),
            Err(StoreError::NotFound(_))
        ));
    }

    #[test]
    fn clearing_delivery_time_clears_marker() {
        let store = memory_store();
        let mut user = seeded("u1", 18, 0);
        user.next_scheduled_run = Some(Utc::now());
        store.upsert_user(&user).unwrap();

        let updated = store.set_delivery_time("u1", None).unwrap();
        assert!(updated.delivery_time.is_none());
        assert!(updated.next_scheduled_run.is_none());
    }

    #[test]
    fn rejects_invalid_delivery_time() {
        let store = memory_store();
        store.upsert_user(&seeded("u1", 18, 0)).unwrap();
        let result = store.set_delivery_time("u1", Some(DeliveryTime { hours: 24, minutes: 0 }));
        assert!(matches!(result, Err(StoreError::InvalidRecord(_))));
    }
}
