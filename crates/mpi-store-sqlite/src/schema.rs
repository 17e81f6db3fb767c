//! SQL schema for the SQLite-backed index.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! the `user_version` number.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
///
/// Uniqueness lives here, not only in application pre-checks: the alias
/// `(kind, value)` pair and the public number carry UNIQUE constraints, and
/// a partial unique index holds the one-non-merged-identity-per-patient
/// invariant. Under concurrent linking the constraint violation, not the
/// pre-check, is the authoritative signal.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS identities (
    identity_id     TEXT PRIMARY KEY,
    public_number   TEXT NOT NULL UNIQUE,
    patient_id      TEXT,
    status          TEXT NOT NULL,   -- 'ACTIVE' | 'MERGED'
    resolution      TEXT NOT NULL,   -- 'UNVERIFIED' | 'CONFIRMED'
    active          INTEGER NOT NULL,
    organization_id TEXT,
    hospital_id     TEXT,
    department_id   TEXT,
    source_system   TEXT,
    metadata        TEXT,            -- free-form JSON or NULL
    mrn_snapshot    TEXT,
    created_at      TEXT NOT NULL,   -- ISO 8601 UTC; store-assigned
    created_by      TEXT NOT NULL,
    updated_at      TEXT NOT NULL,
    updated_by      TEXT NOT NULL
);

-- At most one non-merged identity may reference a given patient.
CREATE UNIQUE INDEX IF NOT EXISTS identities_patient_unique
    ON identities(patient_id)
    WHERE patient_id IS NOT NULL AND status != 'MERGED';

CREATE TABLE IF NOT EXISTS aliases (
    alias_id      TEXT PRIMARY KEY,
    identity_id   TEXT NOT NULL REFERENCES identities(identity_id),
    kind          TEXT NOT NULL,
    value         TEXT NOT NULL,
    source_system TEXT,
    active        INTEGER NOT NULL DEFAULT 1,
    created_at    TEXT NOT NULL,
    created_by    TEXT NOT NULL,
    UNIQUE (kind, value)
);

CREATE INDEX IF NOT EXISTS aliases_identity_idx ON aliases(identity_id);

-- Merges are strictly append-only.
-- No UPDATE or DELETE is ever issued against this table.
CREATE TABLE IF NOT EXISTS merges (
    merge_id        TEXT PRIMARY KEY,
    primary_id      TEXT NOT NULL REFERENCES identities(identity_id),
    secondary_id    TEXT NOT NULL REFERENCES identities(identity_id),
    organization_id TEXT,
    hospital_id     TEXT,
    department_id   TEXT,
    merge_type      TEXT NOT NULL,
    resolution      TEXT NOT NULL,
    notes           TEXT,
    undo_token      TEXT NOT NULL,
    merged_by       TEXT NOT NULL,
    merged_at       TEXT NOT NULL,
    CHECK  (primary_id != secondary_id)
);

CREATE INDEX IF NOT EXISTS merges_secondary_idx ON merges(secondary_id);

PRAGMA user_version = 1;
";
