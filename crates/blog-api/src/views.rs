//! Row → response conversions.

use chrono::{DateTime, Utc};
use tracing::warn;

use blog_db::models::{CardRow, MediaFileRow, UserRow};
use blog_types::api::{AuthorSummary, CardResponse, MediaFileResponse, UserResponse};

use crate::render::markdown_to_html;

pub fn parse_timestamp(raw: &str) -> DateTime<Utc> {
    raw.parse::<DateTime<Utc>>()
        .or_else(|_| {
            // SQLite's datetime('now') has no timezone; treat it as UTC.
            chrono::NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
        })
        .unwrap_or_else(|e| {
            warn!("Corrupt timestamp '{}': {}", raw, e);
            DateTime::default()
        })
}

pub fn user_response(row: UserRow) -> UserResponse {
    UserResponse {
        id: row.id,
        created_at: parse_timestamp(&row.created_at),
        username: row.username,
        email: row.email,
        role: row.role,
    }
}

pub fn media_response(row: MediaFileRow) -> MediaFileResponse {
    MediaFileResponse {
        id: row.id,
        url: row.file_path,
        filename: row.filename,
        file_type: row.file_type,
    }
}

/// `media` is only filled for single-card reads.
pub fn card_response(row: CardRow, media: Option<Vec<MediaFileRow>>) -> CardResponse {
    CardResponse {
        id: row.id,
        content_html: markdown_to_html(&row.content),
        created_at: parse_timestamp(&row.created_at),
        updated_at: parse_timestamp(&row.updated_at),
        author_id: row.author_id,
        author: AuthorSummary {
            id: row.author_id,
            username: row.author_username,
        },
        to_all: row.to_all,
        media: media.map(|rows| rows.into_iter().map(media_response).collect()),
        title: row.title,
        content: row.content,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn parses_stored_and_sqlite_formats() {
        let ts = parse_timestamp("2026-03-04T05:06:07.123456Z");
        assert_eq!((ts.year(), ts.month(), ts.day()), (2026, 3, 4));
        assert_eq!(ts.nanosecond(), 123_456_000);

        let ts = parse_timestamp("2026-03-04 05:06:07");
        assert_eq!(ts.hour(), 5);

        assert_eq!(parse_timestamp("garbage"), DateTime::<Utc>::default());
    }

    #[test]
    fn card_keeps_raw_content() {
        let row = CardRow {
            id: 1,
            title: "T".into(),
            content: "*C*".into(),
            created_at: "2026-01-01T00:00:00.000000Z".into(),
            updated_at: "2026-01-01T00:00:00.000000Z".into(),
            author_id: 7,
            author_username: "alice".into(),
            to_all: false,
        };
        let resp = card_response(row, None);
        assert_eq!(resp.content, "*C*");
        assert_eq!(resp.content_html, "<p><em>C</em></p>\n");
        assert_eq!(resp.author.username, "alice");
        assert!(resp.media.is_none());
    }
}
