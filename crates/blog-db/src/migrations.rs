use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |r| r.get(0),
    )?;

    if version < 1 {
        info!("Running migration v1 (initial schema)");
        conn.execute_batch(
            "
            CREATE TABLE users (
                id              INTEGER PRIMARY KEY AUTOINCREMENT,
                username        TEXT NOT NULL UNIQUE,
                email           TEXT NOT NULL UNIQUE,
                hashed_password TEXT NOT NULL,
                created_at      TEXT NOT NULL,
                role            TEXT NOT NULL DEFAULT 'VIEWER'
                                CHECK (role IN ('ADMIN', 'DEVELOPER', 'VIEWER'))
            );

            CREATE TABLE cards (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                title       TEXT NOT NULL,
                content     TEXT NOT NULL,
                created_at  TEXT NOT NULL,
                updated_at  TEXT NOT NULL,
                author_id   INTEGER NOT NULL REFERENCES users(id),
                to_all      INTEGER NOT NULL DEFAULT 0
            );

            CREATE INDEX idx_cards_created
                ON cards(created_at);

            CREATE TABLE media_files (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                filename    TEXT NOT NULL,
                file_path   TEXT NOT NULL,
                file_type   TEXT NOT NULL,
                uploaded_at TEXT NOT NULL,
                uploader_id INTEGER NOT NULL REFERENCES users(id)
            );

            -- No uniqueness: attaching the same file twice adds a second row.
            CREATE TABLE card_media (
                card_id     INTEGER NOT NULL REFERENCES cards(id) ON DELETE CASCADE,
                media_id    INTEGER NOT NULL REFERENCES media_files(id)
            );

            CREATE INDEX idx_card_media_card
                ON card_media(card_id);

            INSERT INTO schema_version (version) VALUES (1);
            ",
        )?;
    }

    info!("Database migrations complete");
    Ok(())
}
