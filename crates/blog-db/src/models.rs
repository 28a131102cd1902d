//! Database row types: these map directly to SQLite rows.
//! Distinct from blog-types API models to keep the DB layer independent.
//! Timestamps stay as the stored RFC 3339 text.

use blog_types::models::Role;

#[derive(Debug, Clone)]
pub struct UserRow {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub hashed_password: String,
    pub created_at: String,
    pub role: Role,
}

/// A card joined with its author's username.
#[derive(Debug, Clone)]
pub struct CardRow {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub created_at: String,
    pub updated_at: String,
    pub author_id: i64,
    pub author_username: String,
    pub to_all: bool,
}

#[derive(Debug, Clone)]
pub struct MediaFileRow {
    pub id: i64,
    pub filename: String,
    pub file_path: String,
    pub file_type: String,
    pub uploaded_at: String,
    pub uploader_id: i64,
}
