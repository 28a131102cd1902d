use crate::Database;
use crate::models::{CardRow, MediaFileRow, UserRow};
use anyhow::Result;
use blog_types::models::Role;
use chrono::{SecondsFormat, Utc};
use rusqlite::{Connection, Row, params};

/// Current time as stored in every timestamp column. Microsecond RFC 3339
/// keeps lexical and chronological order identical.
pub fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

impl Database {
    // -- Users --

    pub fn get_user_by_username(&self, username: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| user_by_username(conn, username))
    }

    pub fn get_user_by_id(&self, id: i64) -> Result<Option<UserRow>> {
        self.with_conn(|conn| user_by_id(conn, id))
    }

    pub fn list_users(&self) -> Result<Vec<UserRow>> {
        self.with_conn(list_users)
    }

    /// Returns false when no user has that username.
    pub fn set_role_by_username(&self, username: &str, role: Role) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE users SET role = ?1 WHERE username = ?2",
                params![role.as_str(), username],
            )?;
            Ok(changed > 0)
        })
    }

    // -- Cards --

    pub fn list_cards(&self) -> Result<Vec<CardRow>> {
        self.with_conn(list_cards)
    }

    pub fn get_card(&self, id: i64) -> Result<Option<CardRow>> {
        self.with_conn(|conn| card_by_id(conn, id))
    }

    pub fn get_card_media(&self, card_id: i64) -> Result<Vec<MediaFileRow>> {
        self.with_conn(|conn| media_for_card(conn, card_id))
    }

    // -- Media --

    pub fn list_media_files(&self) -> Result<Vec<MediaFileRow>> {
        self.with_conn(list_media_files)
    }
}

// -- Users --

const USER_COLUMNS: &str = "id, username, email, hashed_password, created_at, role";

fn map_user(row: &Row<'_>) -> rusqlite::Result<UserRow> {
    let role: String = row.get(5)?;
    let role = role.parse::<Role>().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(5, rusqlite::types::Type::Text, Box::new(e))
    })?;

    Ok(UserRow {
        id: row.get(0)?,
        username: row.get(1)?,
        email: row.get(2)?,
        hashed_password: row.get(3)?,
        created_at: row.get(4)?,
        role,
    })
}

/// Inserts a user with the default role and returns its id.
pub fn insert_user(
    conn: &Connection,
    username: &str,
    email: &str,
    hashed_password: &str,
    created_at: &str,
) -> Result<i64> {
    conn.execute(
        "INSERT INTO users (username, email, hashed_password, created_at) VALUES (?1, ?2, ?3, ?4)",
        params![username, email, hashed_password, created_at],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn user_by_username(conn: &Connection, username: &str) -> Result<Option<UserRow>> {
    let mut stmt = conn.prepare(&format!("SELECT {USER_COLUMNS} FROM users WHERE username = ?1"))?;
    let row = stmt.query_row([username], map_user).optional()?;
    Ok(row)
}

pub fn user_by_id(conn: &Connection, id: i64) -> Result<Option<UserRow>> {
    let mut stmt = conn.prepare(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"))?;
    let row = stmt.query_row([id], map_user).optional()?;
    Ok(row)
}

pub fn email_exists(conn: &Connection, email: &str) -> Result<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM users WHERE email = ?1",
        [email],
        |r| r.get(0),
    )?;
    Ok(count > 0)
}

pub fn list_users(conn: &Connection) -> Result<Vec<UserRow>> {
    let mut stmt = conn.prepare(&format!("SELECT {USER_COLUMNS} FROM users ORDER BY id"))?;
    let rows = stmt
        .query_map([], map_user)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn update_user_role(conn: &Connection, id: i64, role: Role) -> Result<()> {
    conn.execute(
        "UPDATE users SET role = ?1 WHERE id = ?2",
        params![role.as_str(), id],
    )?;
    Ok(())
}

// -- Cards --

// JOIN users to fetch author_username in a single query (eliminates N+1)
const CARD_SELECT: &str = "SELECT c.id, c.title, c.content, c.created_at, c.updated_at,
        c.author_id, u.username, c.to_all
     FROM cards c
     JOIN users u ON c.author_id = u.id";

fn map_card(row: &Row<'_>) -> rusqlite::Result<CardRow> {
    Ok(CardRow {
        id: row.get(0)?,
        title: row.get(1)?,
        content: row.get(2)?,
        created_at: row.get(3)?,
        updated_at: row.get(4)?,
        author_id: row.get(5)?,
        author_username: row.get(6)?,
        to_all: row.get(7)?,
    })
}

pub fn insert_card(
    conn: &Connection,
    title: &str,
    content: &str,
    author_id: i64,
    to_all: bool,
    now: &str,
) -> Result<i64> {
    conn.execute(
        "INSERT INTO cards (title, content, created_at, updated_at, author_id, to_all)
         VALUES (?1, ?2, ?3, ?3, ?4, ?5)",
        params![title, content, now, author_id, to_all],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn card_by_id(conn: &Connection, id: i64) -> Result<Option<CardRow>> {
    let mut stmt = conn.prepare(&format!("{CARD_SELECT} WHERE c.id = ?1"))?;
    let row = stmt.query_row([id], map_card).optional()?;
    Ok(row)
}

/// Newest first. Identical timestamps fall back to the higher id first.
pub fn list_cards(conn: &Connection) -> Result<Vec<CardRow>> {
    let mut stmt = conn.prepare(&format!(
        "{CARD_SELECT} ORDER BY c.created_at DESC, c.id DESC"
    ))?;
    let rows = stmt
        .query_map([], map_card)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Overwrites title and content. `author_id` is never touched.
pub fn update_card(conn: &Connection, id: i64, title: &str, content: &str, now: &str) -> Result<()> {
    conn.execute(
        "UPDATE cards SET title = ?1, content = ?2, updated_at = ?3 WHERE id = ?4",
        params![title, content, now, id],
    )?;
    Ok(())
}

/// Join rows go with the card through `ON DELETE CASCADE`.
pub fn delete_card(conn: &Connection, id: i64) -> Result<()> {
    conn.execute("DELETE FROM cards WHERE id = ?1", [id])?;
    Ok(())
}

// -- Media --

const MEDIA_COLUMNS: &str = "m.id, m.filename, m.file_path, m.file_type, m.uploaded_at, m.uploader_id";

fn map_media(row: &Row<'_>) -> rusqlite::Result<MediaFileRow> {
    Ok(MediaFileRow {
        id: row.get(0)?,
        filename: row.get(1)?,
        file_path: row.get(2)?,
        file_type: row.get(3)?,
        uploaded_at: row.get(4)?,
        uploader_id: row.get(5)?,
    })
}

pub fn insert_media_file(
    conn: &Connection,
    filename: &str,
    file_path: &str,
    file_type: &str,
    uploader_id: i64,
    now: &str,
) -> Result<i64> {
    conn.execute(
        "INSERT INTO media_files (filename, file_path, file_type, uploaded_at, uploader_id)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![filename, file_path, file_type, now, uploader_id],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn media_file_by_id(conn: &Connection, id: i64) -> Result<Option<MediaFileRow>> {
    let mut stmt = conn.prepare(&format!("SELECT {MEDIA_COLUMNS} FROM media_files m WHERE m.id = ?1"))?;
    let row = stmt.query_row([id], map_media).optional()?;
    Ok(row)
}

pub fn list_media_files(conn: &Connection) -> Result<Vec<MediaFileRow>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {MEDIA_COLUMNS} FROM media_files m ORDER BY m.uploaded_at DESC, m.id DESC"
    ))?;
    let rows = stmt
        .query_map([], map_media)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn media_for_card(conn: &Connection, card_id: i64) -> Result<Vec<MediaFileRow>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {MEDIA_COLUMNS}
         FROM card_media cm
         JOIN media_files m ON cm.media_id = m.id
         WHERE cm.card_id = ?1
         ORDER BY cm.rowid"
    ))?;
    let rows = stmt
        .query_map([card_id], map_media)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn attach_media(conn: &Connection, card_id: i64, media_id: i64) -> Result<()> {
    conn.execute(
        "INSERT INTO card_media (card_id, media_id) VALUES (?1, ?2)",
        params![card_id, media_id],
    )?;
    Ok(())
}

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded() -> (Database, i64, i64) {
        let db = Database::open_in_memory().unwrap();
        let (alice, bob) = db
            .transaction(|tx| -> Result<(i64, i64)> {
                let a = insert_user(tx, "alice", "alice@example.com", "h1", &now_timestamp())?;
                let b = insert_user(tx, "bob", "bob@example.com", "h2", &now_timestamp())?;
                Ok((a, b))
            })
            .unwrap();
        (db, alice, bob)
    }

    #[test]
    fn usernames_and_emails_are_unique() {
        let (db, _, _) = seeded();
        let dup_name = db.transaction(|tx| insert_user(tx, "alice", "other@example.com", "h", "t"));
        assert!(dup_name.is_err());
        let dup_email = db.transaction(|tx| insert_user(tx, "carol", "bob@example.com", "h", "t"));
        assert!(dup_email.is_err());
        assert_eq!(db.list_users().unwrap().len(), 2);
        assert!(db.with_conn(|c| email_exists(c, "bob@example.com")).unwrap());
    }

    #[test]
    fn role_updates() {
        let (db, alice, _) = seeded();
        db.with_conn(|c| update_user_role(c, alice, Role::Developer)).unwrap();
        assert_eq!(db.get_user_by_id(alice).unwrap().unwrap().role, Role::Developer);

        assert!(db.set_role_by_username("bob", Role::Admin).unwrap());
        assert!(!db.set_role_by_username("nobody", Role::Admin).unwrap());
        assert_eq!(db.get_user_by_username("bob").unwrap().unwrap().role, Role::Admin);
    }

    #[test]
    fn cards_list_newest_first_with_author() {
        let (db, alice, bob) = seeded();
        db.with_conn(|c| {
            insert_card(c, "old", "a", alice, false, "2026-01-01T00:00:00.000000Z")?;
            insert_card(c, "new", "b", bob, true, "2026-01-02T00:00:00.000000Z")?;
            Ok(())
        })
        .unwrap();

        let cards = db.list_cards().unwrap();
        assert_eq!(cards.len(), 2);
        assert_eq!(cards[0].title, "new");
        assert_eq!(cards[0].author_username, "bob");
        assert!(cards[0].to_all);
        assert_eq!(cards[1].title, "old");
        assert_eq!(cards[1].author_username, "alice");
    }

    #[test]
    fn update_refreshes_updated_at_only() {
        let (db, alice, _) = seeded();
        let id = db
            .with_conn(|c| insert_card(c, "T", "C", alice, false, "2026-01-01T00:00:00.000000Z"))
            .unwrap();
        db.with_conn(|c| update_card(c, id, "T2", "C2", "2026-01-03T00:00:00.000000Z"))
            .unwrap();

        let card = db.get_card(id).unwrap().unwrap();
        assert_eq!(card.title, "T2");
        assert_eq!(card.content, "C2");
        assert_eq!(card.author_id, alice);
        assert_eq!(card.created_at, "2026-01-01T00:00:00.000000Z");
        assert_eq!(card.updated_at, "2026-01-03T00:00:00.000000Z");
    }

    #[test]
    fn deleting_card_cascades_join_rows() {
        let (db, alice, _) = seeded();
        let (card, media) = db
            .with_conn(|c| {
                let card = insert_card(c, "T", "C", alice, false, &now_timestamp())?;
                let media = insert_media_file(c, "a.png", "/static/media/a.png", "png", alice, &now_timestamp())?;
                attach_media(c, card, media)?;
                attach_media(c, card, media)?;
                Ok((card, media))
            })
            .unwrap();

        assert_eq!(db.get_card_media(card).unwrap().len(), 2);

        db.with_conn(|c| delete_card(c, card)).unwrap();
        assert!(db.get_card(card).unwrap().is_none());

        let joins: i64 = db
            .with_conn(|c| Ok(c.query_row("SELECT COUNT(*) FROM card_media", [], |r| r.get(0))?))
            .unwrap();
        assert_eq!(joins, 0);
        assert!(db.with_conn(|c| media_file_by_id(c, media)).unwrap().is_some());
    }
}
