//! Database schema definitions.
//!
//! Migrations are applied in order; a migration is never edited once
//! released, new changes go into a new entry.

/// List of migrations to apply.
pub const MIGRATIONS: &[&str] = &[
    // v1: Device accounts
    r#"
CREATE TABLE accounts (
    device_id        TEXT PRIMARY KEY NOT NULL,
    credential_hash  TEXT NOT NULL,
    created_at       TEXT NOT NULL
);
"#,
    // v2: Mail items
    r#"
CREATE TABLE mail_items (
    id               INTEGER PRIMARY KEY AUTOINCREMENT,
    owner_device_id  TEXT NOT NULL REFERENCES accounts(device_id) ON DELETE CASCADE,
    direction        TEXT NOT NULL CHECK (direction IN ('inbound', 'outbound')),
    sender           TEXT NOT NULL,
    recipient        TEXT NOT NULL,
    subject          TEXT,
    body             BLOB NOT NULL,
    state            TEXT NOT NULL DEFAULT 'pending'
                     CHECK (state IN ('pending', 'delivered', 'deleted')),
    created_at       TEXT NOT NULL,
    delivered_at     TEXT,
    deleted_at       TEXT
);

CREATE INDEX idx_mail_items_owner_state ON mail_items(owner_device_id, direction, state);
CREATE INDEX idx_mail_items_direction_state ON mail_items(direction, state);
"#,
    // v3: Mail state can only move forward
    r#"
CREATE TRIGGER trg_mail_items_state_forward
BEFORE UPDATE OF state ON mail_items
WHEN (OLD.state = 'deleted' AND NEW.state <> 'deleted')
  OR (OLD.state = 'delivered' AND NEW.state = 'pending')
BEGIN
    SELECT RAISE(ABORT, 'mail item state cannot move backwards');
END;
"#,
];
