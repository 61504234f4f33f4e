//! Note Store
//!
//! Persistence for notes and their tags. Every lookup is scoped to the
//! owning user, so a note that belongs to someone else behaves exactly like
//! a note that does not exist.

use crate::error::AuthError;
use crate::models::{now, Note, NoteFields, Tag};

use async_trait::async_trait;
use sqlx::PgPool;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Owner-scoped note storage
#[async_trait]
pub trait NoteStore: Send + Sync {
    async fn create(&self, user_id: i64, fields: NoteFields) -> Result<Note, AuthError>;

    /// Notes of `user_id` whose archived flag equals `archived`, oldest first
    async fn list(&self, user_id: i64, archived: bool) -> Result<Vec<Note>, AuthError>;

    async fn find(&self, user_id: i64, note_id: i64) -> Result<Option<Note>, AuthError>;

    /// Replace the editable fields; `None` when the note is not the user's
    async fn update(
        &self,
        user_id: i64,
        note_id: i64,
        fields: NoteFields,
    ) -> Result<Option<Note>, AuthError>;

    /// `false` when the note is not the user's
    async fn delete(&self, user_id: i64, note_id: i64) -> Result<bool, AuthError>;

    /// Attach tags by name, creating missing ones.
    ///
    /// A tag already on the note is not attached twice.
    async fn add_tags(
        &self,
        user_id: i64,
        note_id: i64,
        names: &[String],
    ) -> Result<Option<Note>, AuthError>;
}

// ============================================
// PostgreSQL
// ============================================

const NOTE_COLUMNS: &str = "id, user_id, title, content, \
    COALESCE(is_archived, FALSE) AS is_archived, theme_color, font_family, \
    created_at, updated_at";

/// PostgreSQL-backed note store
#[derive(Debug, Clone)]
pub struct PgNoteStore {
    db: PgPool,
}

impl PgNoteStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Create the notes, tags and note_tags tables if missing.
    ///
    /// Needs the users table, so run after [`crate::PgUserStore::ensure_schema`].
    pub async fn ensure_schema(&self) -> Result<(), AuthError> {
        tracing::info!("Ensuring notes tables exist");

        let statements = [
            r#"
            CREATE TABLE IF NOT EXISTS notes (
                id BIGSERIAL PRIMARY KEY,
                user_id BIGINT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                title VARCHAR(255),
                content TEXT,
                is_archived BOOLEAN NOT NULL DEFAULT FALSE,
                theme_color VARCHAR(20),
                font_family VARCHAR(50),
                created_at TIMESTAMP NOT NULL DEFAULT NOW(),
                updated_at TIMESTAMP NOT NULL DEFAULT NOW()
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS tags (
                id BIGSERIAL PRIMARY KEY,
                name VARCHAR(50) NOT NULL UNIQUE
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS note_tags (
                note_id BIGINT NOT NULL REFERENCES notes(id) ON DELETE CASCADE,
                tag_id BIGINT NOT NULL REFERENCES tags(id) ON DELETE CASCADE,
                PRIMARY KEY (note_id, tag_id)
            )
            "#,
        ];

        for statement in statements {
            sqlx::query(statement).execute(&self.db).await?;
        }

        Ok(())
    }

    /// Fill in the tags of each note with one query
    async fn attach_tags(&self, mut notes: Vec<Note>) -> Result<Vec<Note>, AuthError> {
        if notes.is_empty() {
            return Ok(notes);
        }

        let ids: Vec<i64> = notes.iter().map(|n| n.id).collect();
        let rows: Vec<(i64, i64, String)> = sqlx::query_as(
            "SELECT nt.note_id, t.id, t.name FROM tags t
             JOIN note_tags nt ON nt.tag_id = t.id
             WHERE nt.note_id = ANY($1)
             ORDER BY t.id",
        )
        .bind(&ids)
        .fetch_all(&self.db)
        .await?;

        let mut by_note: HashMap<i64, Vec<Tag>> = HashMap::new();
        for (note_id, id, name) in rows {
            by_note.entry(note_id).or_default().push(Tag { id, name });
        }
        for note in &mut notes {
            note.tags = by_note.remove(&note.id).unwrap_or_default();
        }

        Ok(notes)
    }

    async fn attach_one(&self, note: Option<Note>) -> Result<Option<Note>, AuthError> {
        match note {
            Some(note) => Ok(self.attach_tags(vec![note]).await?.pop()),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl NoteStore for PgNoteStore {
    async fn create(&self, user_id: i64, fields: NoteFields) -> Result<Note, AuthError> {
        let note: Note = sqlx::query_as(&format!(
            r#"INSERT INTO notes (user_id, title, content, is_archived, theme_color, font_family)
               VALUES ($1, $2, $3, $4, $5, $6)
               RETURNING {NOTE_COLUMNS}"#
        ))
        .bind(user_id)
        .bind(&fields.title)
        .bind(&fields.content)
        .bind(fields.is_archived)
        .bind(&fields.theme_color)
        .bind(&fields.font_family)
        .fetch_one(&self.db)
        .await?;

        Ok(note)
    }

    async fn list(&self, user_id: i64, archived: bool) -> Result<Vec<Note>, AuthError> {
        let notes: Vec<Note> = sqlx::query_as(&format!(
            "SELECT {NOTE_COLUMNS} FROM notes
             WHERE user_id = $1 AND COALESCE(is_archived, FALSE) = $2
             ORDER BY id"
        ))
        .bind(user_id)
        .bind(archived)
        .fetch_all(&self.db)
        .await?;

        self.attach_tags(notes).await
    }

    async fn find(&self, user_id: i64, note_id: i64) -> Result<Option<Note>, AuthError> {
        let note: Option<Note> = sqlx::query_as(&format!(
            "SELECT {NOTE_COLUMNS} FROM notes WHERE id = $1 AND user_id = $2"
        ))
        .bind(note_id)
        .bind(user_id)
        .fetch_optional(&self.db)
        .await?;

        self.attach_one(note).await
    }

    async fn update(
        &self,
        user_id: i64,
        note_id: i64,
        fields: NoteFields,
    ) -> Result<Option<Note>, AuthError> {
        let note: Option<Note> = sqlx::query_as(&format!(
            r#"UPDATE notes SET
               title = $3, content = $4, is_archived = $5,
               theme_color = $6, font_family = $7, updated_at = NOW()
               WHERE id = $1 AND user_id = $2
               RETURNING {NOTE_COLUMNS}"#
        ))
        .bind(note_id)
        .bind(user_id)
        .bind(&fields.title)
        .bind(&fields.content)
        .bind(fields.is_archived)
        .bind(&fields.theme_color)
        .bind(&fields.font_family)
        .fetch_optional(&self.db)
        .await?;

        self.attach_one(note).await
    }

    async fn delete(&self, user_id: i64, note_id: i64) -> Result<bool, AuthError> {
        let result = sqlx::query("DELETE FROM notes WHERE id = $1 AND user_id = $2")
            .bind(note_id)
            .bind(user_id)
            .execute(&self.db)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn add_tags(
        &self,
        user_id: i64,
        note_id: i64,
        names: &[String],
    ) -> Result<Option<Note>, AuthError> {
        let mut tx = self.db.begin().await?;

        let owned: Option<(i64,)> =
            sqlx::query_as("SELECT id FROM notes WHERE id = $1 AND user_id = $2 FOR UPDATE")
                .bind(note_id)
                .bind(user_id)
                .fetch_optional(&mut *tx)
                .await?;
        if owned.is_none() {
            return Ok(None);
        }

        for name in names {
            let (tag_id,): (i64,) = sqlx::query_as(
                "INSERT INTO tags (name) VALUES ($1)
                 ON CONFLICT (name) DO UPDATE SET name = EXCLUDED.name
                 RETURNING id",
            )
            .bind(name)
            .fetch_one(&mut *tx)
            .await?;

            sqlx::query(
                "INSERT INTO note_tags (note_id, tag_id) VALUES ($1, $2)
                 ON CONFLICT DO NOTHING",
            )
            .bind(note_id)
            .bind(tag_id)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        self.find(user_id, note_id).await
    }
}

// ============================================
// In-memory
// ============================================

#[derive(Debug, Default)]
struct NoteState {
    next_note_id: i64,
    next_tag_id: i64,
    notes: Vec<Note>,
    tags: Vec<Tag>,
}

impl NoteState {
    fn owned_mut(&mut self, user_id: i64, note_id: i64) -> Option<&mut Note> {
        self.notes
            .iter_mut()
            .find(|n| n.id == note_id && n.user_id == user_id)
    }

    fn tag_named(&mut self, name: &str) -> Tag {
        if let Some(tag) = self.tags.iter().find(|t| t.name == name) {
            return tag.clone();
        }

        self.next_tag_id += 1;
        let tag = Tag {
            id: self.next_tag_id,
            name: name.to_string(),
        };
        self.tags.push(tag.clone());
        tag
    }
}

/// In-process note store, lost on restart
#[derive(Debug, Default)]
pub struct MemoryNoteStore {
    state: RwLock<NoteState>,
}

impl MemoryNoteStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of distinct tags across all notes
    pub async fn tag_count(&self) -> usize {
        self.state.read().await.tags.len()
    }
}

#[async_trait]
impl NoteStore for MemoryNoteStore {
    async fn create(&self, user_id: i64, fields: NoteFields) -> Result<Note, AuthError> {
        let mut state = self.state.write().await;

        state.next_note_id += 1;
        let created_at = now();
        let note = Note {
            id: state.next_note_id,
            user_id,
            title: fields.title,
            content: fields.content,
            is_archived: fields.is_archived,
            theme_color: fields.theme_color,
            font_family: fields.font_family,
            created_at,
            updated_at: created_at,
            tags: Vec::new(),
        };
        state.notes.push(note.clone());

        Ok(note)
    }

    async fn list(&self, user_id: i64, archived: bool) -> Result<Vec<Note>, AuthError> {
        let state = self.state.read().await;
        Ok(state
            .notes
            .iter()
            .filter(|n| n.user_id == user_id && n.is_archived == archived)
            .cloned()
            .collect())
    }

    async fn find(&self, user_id: i64, note_id: i64) -> Result<Option<Note>, AuthError> {
        let state = self.state.read().await;
        Ok(state
            .notes
            .iter()
            .find(|n| n.id == note_id && n.user_id == user_id)
            .cloned())
    }

    async fn update(
        &self,
        user_id: i64,
        note_id: i64,
        fields: NoteFields,
    ) -> Result<Option<Note>, AuthError> {
        let mut state = self.state.write().await;
        let Some(note) = state.owned_mut(user_id, note_id) else {
            return Ok(None);
        };

        note.title = fields.title;
        note.content = fields.content;
        note.is_archived = fields.is_archived;
        note.theme_color = fields.theme_color;
        note.font_family = fields.font_family;
        note.updated_at = now();

        Ok(Some(note.clone()))
    }

    async fn delete(&self, user_id: i64, note_id: i64) -> Result<bool, AuthError> {
        let mut state = self.state.write().await;
        let before = state.notes.len();
        state
            .notes
            .retain(|n| !(n.id == note_id && n.user_id == user_id));
        Ok(state.notes.len() < before)
    }

    async fn add_tags(
        &self,
        user_id: i64,
        note_id: i64,
        names: &[String],
    ) -> Result<Option<Note>, AuthError> {
        let mut state = self.state.write().await;
        if state.owned_mut(user_id, note_id).is_none() {
            return Ok(None);
        }

        let tags: Vec<Tag> = names.iter().map(|name| state.tag_named(name)).collect();

        let Some(note) = state.owned_mut(user_id, note_id) else {
            return Ok(None);
        };
        for tag in tags {
            if !note.tags.iter().any(|t| t.id == tag.id) {
                note.tags.push(tag);
            }
        }
        note.tags.sort_by_key(|t| t.id);

        Ok(Some(note.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn titled(title: &str) -> NoteFields {
        NoteFields {
            title: Some(title.into()),
            ..NoteFields::default()
        }
    }

    fn names(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    #[tokio::test]
    async fn test_create_and_find() {
        let store = MemoryNoteStore::new();
        let note = store.create(1, titled("Groceries")).await.unwrap();

        assert_eq!(note.id, 1);
        assert_eq!(note.user_id, 1);
        assert!(!note.is_archived);
        assert_eq!(note.created_at, note.updated_at);
        assert!(note.tags.is_empty());

        assert_eq!(store.find(1, note.id).await.unwrap(), Some(note));
    }

    #[tokio::test]
    async fn test_other_users_notes_are_invisible() {
        let store = MemoryNoteStore::new();
        let note = store.create(1, titled("Diary")).await.unwrap();

        assert_eq!(store.find(2, note.id).await.unwrap(), None);
        assert_eq!(store.update(2, note.id, titled("Mine now")).await.unwrap(), None);
        assert_eq!(store.add_tags(2, note.id, &names(&["x"])).await.unwrap(), None);
        assert!(!store.delete(2, note.id).await.unwrap());
        assert!(store.list(2, false).await.unwrap().is_empty());

        // Untouched for the owner
        let still = store.find(1, note.id).await.unwrap().unwrap();
        assert_eq!(still.title.as_deref(), Some("Diary"));
        assert_eq!(store.tag_count().await, 0);
    }

    #[tokio::test]
    async fn test_list_filters_archived() {
        let store = MemoryNoteStore::new();
        store.create(1, titled("active")).await.unwrap();
        store
            .create(
                1,
                NoteFields {
                    is_archived: true,
                    ..titled("old")
                },
            )
            .await
            .unwrap();

        let active = store.list(1, false).await.unwrap();
        let archived = store.list(1, true).await.unwrap();

        assert_eq!(active.len(), 1);
        assert_eq!(active[0].title.as_deref(), Some("active"));
        assert_eq!(archived.len(), 1);
        assert_eq!(archived[0].title.as_deref(), Some("old"));
    }

    #[tokio::test]
    async fn test_update_replaces_fields() {
        let store = MemoryNoteStore::new();
        let note = store.create(1, titled("draft")).await.unwrap();

        let updated = store
            .update(
                1,
                note.id,
                NoteFields {
                    content: Some("body".into()),
                    ..titled("final")
                },
            )
            .await
            .unwrap()
            .unwrap();

        assert_eq!(updated.title.as_deref(), Some("final"));
        assert_eq!(updated.content.as_deref(), Some("body"));
        assert_eq!(updated.created_at, note.created_at);
        assert!(updated.updated_at >= note.updated_at);
    }

    #[tokio::test]
    async fn test_delete() {
        let store = MemoryNoteStore::new();
        let note = store.create(1, titled("gone")).await.unwrap();

        assert!(store.delete(1, note.id).await.unwrap());
        assert!(!store.delete(1, note.id).await.unwrap());
        assert_eq!(store.find(1, note.id).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_tags_are_shared_and_deduplicated() {
        let store = MemoryNoteStore::new();
        let first = store.create(1, titled("a")).await.unwrap();
        let second = store.create(2, titled("b")).await.unwrap();

        let tagged = store
            .add_tags(1, first.id, &names(&["work", "urgent", "work"]))
            .await
            .unwrap()
            .unwrap();
        let tag_names: Vec<_> = tagged.tags.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(tag_names, ["work", "urgent"]);

        // Adding again does not duplicate
        let again = store
            .add_tags(1, first.id, &names(&["urgent"]))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(again.tags.len(), 2);

        // Another note reuses the existing tag row
        let other = store
            .add_tags(2, second.id, &names(&["work"]))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(other.tags[0], tagged.tags[0]);
        assert_eq!(store.tag_count().await, 2);
    }
}
