//! SQL schema for the edustat SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS schools (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    name        TEXT NOT NULL UNIQUE COLLATE NOCASE,
    location    TEXT,
    school_type TEXT,
    created_at  TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS subjects (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    name        TEXT NOT NULL UNIQUE COLLATE NOCASE,
    code        TEXT,
    created_at  TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS academic_years (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    name        TEXT NOT NULL UNIQUE,
    start_date  TEXT,              -- YYYY-MM-DD
    end_date    TEXT,
    active      INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS terms (
    id               INTEGER PRIMARY KEY AUTOINCREMENT,
    name             TEXT NOT NULL,
    academic_year_id INTEGER NOT NULL REFERENCES academic_years(id),
    start_date       TEXT,
    end_date         TEXT
);

-- Append-only. No UPDATE or DELETE is ever issued against this table.
-- Year and term ids are not foreign keys: uploads may target a scope the
-- calendar tables do not know about.
CREATE TABLE IF NOT EXISTS performance_records (
    id               INTEGER PRIMARY KEY AUTOINCREMENT,
    school_id        INTEGER NOT NULL REFERENCES schools(id),
    academic_year_id INTEGER NOT NULL,
    term_id          INTEGER,          -- NULL = year-wide
    subject_id       INTEGER NOT NULL REFERENCES subjects(id),
    average_score    INTEGER NOT NULL CHECK (average_score BETWEEN 0 AND 100),
    pass_rate        INTEGER NOT NULL CHECK (pass_rate BETWEEN 0 AND 100),
    attendance_rate  INTEGER CHECK (attendance_rate BETWEEN 0 AND 100),
    created_at       TEXT NOT NULL
);

-- Derived cache, rewritten on every ingestion touching its scope.
CREATE TABLE IF NOT EXISTS school_performance_summaries (
    id               INTEGER PRIMARY KEY AUTOINCREMENT,
    school_id        INTEGER NOT NULL REFERENCES schools(id),
    academic_year_id INTEGER NOT NULL,
    term_id          INTEGER,
    overall_average  INTEGER NOT NULL,
    success_rate     INTEGER NOT NULL,
    attendance_rate  INTEGER,
    improvement_rate INTEGER,
    ranking          INTEGER,
    created_at       TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS file_uploads (
    id               INTEGER PRIMARY KEY AUTOINCREMENT,
    filename         TEXT NOT NULL,
    file_size        INTEGER NOT NULL,
    academic_year_id INTEGER NOT NULL,
    term_id          INTEGER,
    status           TEXT NOT NULL,   -- 'processing' | 'processed' | 'error'
    content_hash     TEXT NOT NULL,
    created_at       TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS records_school_scope_idx
    ON performance_records(school_id, academic_year_id, term_id);
CREATE INDEX IF NOT EXISTS records_subject_scope_idx
    ON performance_records(subject_id, academic_year_id, term_id);
CREATE INDEX IF NOT EXISTS summaries_scope_idx
    ON school_performance_summaries(academic_year_id, term_id, school_id);
CREATE INDEX IF NOT EXISTS uploads_hash_idx
    ON file_uploads(content_hash);

PRAGMA user_version = 1;
";
