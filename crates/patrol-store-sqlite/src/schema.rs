//! SQL schema for the patrol SQLite store.
//!
//! Executed once at connection startup via `PRAGMA user_version`. Future
//! migrations will be gated on that version number.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS staff (
    staff_id     TEXT PRIMARY KEY,
    display_name TEXT NOT NULL,
    active       INTEGER NOT NULL DEFAULT 1,
    created_at   TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS incidents (
    incident_id TEXT PRIMARY KEY,
    status      TEXT NOT NULL,   -- IncidentStatus, snake_case
    summary     TEXT NOT NULL,
    location    TEXT,
    reporter    TEXT,
    created_at  TEXT NOT NULL,
    updated_at  TEXT NOT NULL
);

-- One row per dispatch unit, never one row per staff member.
CREATE TABLE IF NOT EXISTS patrol_groups (
    group_id       TEXT PRIMARY KEY,
    incident_id    TEXT NOT NULL REFERENCES incidents(incident_id),
    scheduled_date TEXT NOT NULL,   -- %Y-%m-%d
    scheduled_time TEXT NOT NULL,   -- %H:%M:%S
    status         TEXT NOT NULL,   -- PatrolStatus, snake_case
    notes          TEXT NOT NULL DEFAULT '',
    created_at     TEXT NOT NULL,
    updated_at     TEXT NOT NULL
);

-- Group membership. A non-terminal group always has at least one row here.
CREATE TABLE IF NOT EXISTS patrol_group_staff (
    group_id TEXT NOT NULL REFERENCES patrol_groups(group_id),
    staff_id TEXT NOT NULL REFERENCES staff(staff_id),
    PRIMARY KEY (group_id, staff_id)
);

CREATE INDEX IF NOT EXISTS patrol_groups_date_idx     ON patrol_groups(scheduled_date, status);
CREATE INDEX IF NOT EXISTS patrol_groups_incident_idx ON patrol_groups(incident_id);
CREATE INDEX IF NOT EXISTS patrol_group_staff_idx     ON patrol_group_staff(staff_id);
CREATE INDEX IF NOT EXISTS incidents_status_idx       ON incidents(status);

PRAGMA user_version = 1;
";
