//! SQLite-based store implementation

use chrono::{DateTime, Local, NaiveDate};
use focus_api::PlannerSnapshot;
use rusqlite::{Connection, OptionalExtension, params};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, warn};

use crate::{AuditEvent, AuditEventType, Store, StoreError, StoreResult};

/// SQLite-based store
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open or create a store at the given path
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let conn = Connection::open(path)?;
        Self::with_connection(conn)
    }

    /// Create an in-memory store (for testing)
    pub fn in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> StoreResult<Self> {
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    fn conn(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| StoreError::Database("store lock poisoned".into()))
    }

    fn init_schema(&self) -> StoreResult<()> {
        let conn = self.conn()?;

        conn.execute_batch(
            r#"
            -- Planner state (single row)
            CREATE TABLE IF NOT EXISTS planner (
                id INTEGER PRIMARY KEY CHECK (id = 1),
                planner_json TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            -- Focus minutes per calendar day
            CREATE TABLE IF NOT EXISTS focus_minutes (
                day TEXT PRIMARY KEY,
                minutes INTEGER NOT NULL DEFAULT 0
            );

            -- Audit log (append-only)
            CREATE TABLE IF NOT EXISTS audit_log (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                timestamp TEXT NOT NULL,
                event_json TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_audit_timestamp ON audit_log(timestamp);
            "#,
        )?;

        debug!("Store schema initialized");
        Ok(())
    }
}

fn day_key(day: NaiveDate) -> String {
    day.format("%Y-%m-%d").to_string()
}

impl Store for SqliteStore {
    fn load_planner(&self) -> StoreResult<Option<PlannerSnapshot>> {
        let conn = self.conn()?;

        let json: Option<String> = conn
            .query_row("SELECT planner_json FROM planner WHERE id = 1", [], |row| {
                row.get(0)
            })
            .optional()?;

        match json {
            Some(s) => Ok(Some(serde_json::from_str(&s)?)),
            None => Ok(None),
        }
    }

    fn save_planner(&self, planner: &PlannerSnapshot) -> StoreResult<()> {
        let conn = self.conn()?;
        let json = serde_json::to_string(planner)?;

        conn.execute(
            r#"
            INSERT INTO planner (id, planner_json, updated_at)
            VALUES (1, ?, ?)
            ON CONFLICT(id)
            DO UPDATE SET planner_json = excluded.planner_json,
                          updated_at = excluded.updated_at
            "#,
            params![json, focus_util::now().to_rfc3339()],
        )?;

        debug!(
            slots = planner.schedule.slot_count(),
            restricted = planner.restricted.len(),
            "Planner saved"
        );
        Ok(())
    }

    fn get_focus_minutes(&self, day: NaiveDate) -> StoreResult<u32> {
        let conn = self.conn()?;

        let minutes: Option<i64> = conn
            .query_row(
                "SELECT minutes FROM focus_minutes WHERE day = ?",
                [day_key(day)],
                |row| row.get(0),
            )
            .optional()?;

        Ok(minutes.map_or(0, |m| u32::try_from(m.max(0)).unwrap_or(u32::MAX)))
    }

    fn set_focus_minutes(&self, day: NaiveDate, minutes: u32) -> StoreResult<()> {
        let conn = self.conn()?;

        conn.execute(
            r#"
            INSERT INTO focus_minutes (day, minutes)
            VALUES (?, ?)
            ON CONFLICT(day)
            DO UPDATE SET minutes = MAX(minutes, excluded.minutes)
            "#,
            params![day_key(day), i64::from(minutes)],
        )?;

        debug!(day = %day, minutes, "Focus minutes recorded");
        Ok(())
    }

    fn append_audit(&self, mut event: AuditEvent) -> StoreResult<()> {
        let conn = self.conn()?;
        let event_json = serde_json::to_string(&event.event)?;

        conn.execute(
            "INSERT INTO audit_log (timestamp, event_json) VALUES (?, ?)",
            params![event.timestamp.to_rfc3339(), event_json],
        )?;

        event.id = conn.last_insert_rowid();
        debug!(event_id = event.id, "Audit event appended");

        Ok(())
    }

    fn get_recent_audits(&self, limit: usize) -> StoreResult<Vec<AuditEvent>> {
        let conn = self.conn()?;

        let mut stmt = conn.prepare(
            "SELECT id, timestamp, event_json FROM audit_log ORDER BY id DESC LIMIT ?",
        )?;

        let rows = stmt.query_map([limit as i64], |row| {
            let id: i64 = row.get(0)?;
            let timestamp_str: String = row.get(1)?;
            let event_json: String = row.get(2)?;
            Ok((id, timestamp_str, event_json))
        })?;

        let mut events = Vec::new();
        for row in rows {
            let (id, timestamp_str, event_json) = row?;
            let timestamp = DateTime::parse_from_rfc3339(&timestamp_str)
                .map(|dt| dt.with_timezone(&Local))
                .unwrap_or_else(|_| focus_util::now());
            let event: AuditEventType = serde_json::from_str(&event_json)?;

            events.push(AuditEvent {
                id,
                timestamp,
                event,
            });
        }

        Ok(events)
    }

    fn is_healthy(&self) -> bool {
        match self.conn.lock() {
            Ok(conn) => conn.query_row("SELECT 1", [], |_| Ok(())).is_ok(),
            Err(_) => {
                warn!("Store lock poisoned");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use focus_api::{RestrictionSet, WeekSchedule};
    use focus_util::{AppId, DayKey};

    fn sample_planner() -> PlannerSnapshot {
        let mut schedule = WeekSchedule::new();
        schedule.insert(DayKey::Monday, 9).unwrap();
        schedule.insert(DayKey::Sunday, 22).unwrap();
        let restricted: RestrictionSet =
            [AppId::new("game"), AppId::new("video")].into_iter().collect();
        PlannerSnapshot {
            schedule,
            restricted,
        }
    }

    #[test]
    fn test_in_memory_store() {
        let store = SqliteStore::in_memory().unwrap();
        assert!(store.is_healthy());
    }

    #[test]
    fn test_planner_persistence() {
        let store = SqliteStore::in_memory().unwrap();
        assert!(store.load_planner().unwrap().is_none());

        let planner = sample_planner();
        store.save_planner(&planner).unwrap();
        assert_eq!(store.load_planner().unwrap(), Some(planner.clone()));

        // Saving again replaces the single row
        let mut updated = planner;
        updated.restricted.toggle(AppId::new("game"));
        store.save_planner(&updated).unwrap();
        assert_eq!(store.load_planner().unwrap(), Some(updated));
    }

    #[test]
    fn test_focus_minutes_per_day() {
        let store = SqliteStore::in_memory().unwrap();
        let monday = NaiveDate::from_ymd_opt(2025, 12, 29).unwrap();
        let tuesday = NaiveDate::from_ymd_opt(2025, 12, 30).unwrap();

        assert_eq!(store.get_focus_minutes(monday).unwrap(), 0);

        store.set_focus_minutes(monday, 12).unwrap();
        store.set_focus_minutes(tuesday, 3).unwrap();
        assert_eq!(store.get_focus_minutes(monday).unwrap(), 12);
        assert_eq!(store.get_focus_minutes(tuesday).unwrap(), 3);

        // Never decreases
        store.set_focus_minutes(monday, 5).unwrap();
        assert_eq!(store.get_focus_minutes(monday).unwrap(), 12);
    }

    #[test]
    fn test_audit_log() {
        let store = SqliteStore::in_memory().unwrap();

        store
            .append_audit(AuditEvent::new(AuditEventType::DaemonStarted))
            .unwrap();
        store
            .append_audit(AuditEvent::new(AuditEventType::SlotToggled {
                day: DayKey::Monday,
                hour: 9,
                scheduled: true,
            }))
            .unwrap();

        let events = store.get_recent_audits(10).unwrap();
        assert_eq!(events.len(), 2);
        assert!(matches!(
            events[0].event,
            AuditEventType::SlotToggled { hour: 9, .. }
        ));
        assert!(matches!(events[1].event, AuditEventType::DaemonStarted));
        assert!(events[0].id > events[1].id);
    }

    #[test]
    fn test_reopen_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("focusd.db");
        let planner = sample_planner();

        {
            let store = SqliteStore::open(&path).unwrap();
            store.save_planner(&planner).unwrap();
        }

        let store = SqliteStore::open(&path).unwrap();
        assert_eq!(store.load_planner().unwrap(), Some(planner));
    }
}
