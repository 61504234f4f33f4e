//! Authentication Models
//!
//! Data structures for authentication requests, responses, and database entities.

use chrono::{NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use sqlx::FromRow;
use validator::Validate;

// ============================================
// Database Entities
// ============================================

/// User entity from database
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub username: String,
    #[serde(skip_serializing)]
    #[sqlx(rename = "hashed_password")]
    pub password_hash: String,
    pub is_active: bool,
    pub profile_picture: Option<String>,
}

/// User record ready to be persisted
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub username: String,
    pub password_hash: String,
}

// ============================================
// Request DTOs
// ============================================

/// Registration request
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(
        email(message = "Invalid email format"),
        length(max = 255, message = "Email must be at most 255 characters")
    )]
    pub email: String,

    #[validate(length(min = 1, max = 100, message = "Username must be 1-100 characters"))]
    pub username: String,

    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

/// OAuth2 password form; `username` may hold either a username or an email
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct LoginForm {
    #[validate(length(min = 1, message = "Username is required"))]
    pub username: String,

    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

/// Credentials callback request (email + password)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CredentialsRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

impl CredentialsRequest {
    /// Both fields, if present and non-empty
    pub fn credentials(&self) -> Option<(&str, &str)> {
        let email = self.email.as_deref().filter(|e| !e.is_empty())?;
        let password = self.password.as_deref().filter(|p| !p.is_empty())?;
        Some((email, password))
    }
}

// ============================================
// Response DTOs
// ============================================

/// User response (public user data without sensitive fields)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserResponse {
    pub id: i64,
    pub email: String,
    pub username: String,
    pub is_active: bool,
    pub profile_picture: Option<String>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            username: user.username,
            is_active: user.is_active,
            profile_picture: user.profile_picture,
        }
    }
}

/// Bearer token response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
}

impl TokenResponse {
    pub fn bearer(access_token: String) -> Self {
        Self {
            access_token,
            token_type: "bearer".to_string(),
        }
    }
}

/// Credentials callback response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CredentialsResponse {
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(rename = "accessToken")]
    pub access_token: String,
}

impl CredentialsResponse {
    pub fn new(user: &User, access_token: String) -> Self {
        Self {
            id: user.id.to_string(),
            name: user.username.clone(),
            email: user.email.clone(),
            access_token,
        }
    }
}

// ============================================
// Notes
// ============================================

/// Tag entity, shared by every note that carries it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Tag {
    pub id: i64,
    pub name: String,
}

/// Note entity from database, with its tags attached
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Note {
    pub id: i64,
    pub user_id: i64,
    pub title: Option<String>,
    pub content: Option<String>,
    pub is_archived: bool,
    pub theme_color: Option<String>,
    pub font_family: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
    #[sqlx(skip)]
    #[serde(default)]
    pub tags: Vec<Tag>,
}

impl Note {
    /// The user-editable part of the note
    pub fn fields(&self) -> NoteFields {
        NoteFields {
            title: self.title.clone(),
            content: self.content.clone(),
            is_archived: self.is_archived,
            theme_color: self.theme_color.clone(),
            font_family: self.font_family.clone(),
        }
    }
}

/// Editable note fields; the create request body
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct NoteFields {
    #[validate(length(max = 255, message = "Title must be at most 255 characters"))]
    pub title: Option<String>,

    pub content: Option<String>,

    #[serde(default)]
    pub is_archived: bool,

    #[validate(length(max = 20, message = "Theme color must be at most 20 characters"))]
    pub theme_color: Option<String>,

    #[validate(length(max = 50, message = "Font family must be at most 50 characters"))]
    pub font_family: Option<String>,
}

/// Partial note update.
///
/// Absent fields are left alone. For the nullable fields an explicit `null`
/// clears the value, so those are `Some(None)`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct NoteUpdate {
    #[serde(default, deserialize_with = "present")]
    pub title: Option<Option<String>>,

    #[serde(default, deserialize_with = "present")]
    pub content: Option<Option<String>>,

    pub is_archived: Option<bool>,

    #[serde(default, deserialize_with = "present")]
    pub theme_color: Option<Option<String>>,

    #[serde(default, deserialize_with = "present")]
    pub font_family: Option<Option<String>>,
}

fn present<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}

impl NoteUpdate {
    /// Overlay the fields that were sent onto `fields`
    pub fn apply(self, mut fields: NoteFields) -> NoteFields {
        if let Some(title) = self.title {
            fields.title = title;
        }
        if let Some(content) = self.content {
            fields.content = content;
        }
        if let Some(is_archived) = self.is_archived {
            fields.is_archived = is_archived;
        }
        if let Some(theme_color) = self.theme_color {
            fields.theme_color = theme_color;
        }
        if let Some(font_family) = self.font_family {
            fields.font_family = font_family;
        }
        fields
    }
}

/// One entry of the add-tags request body
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct TagCreate {
    #[validate(length(min = 1, max = 50, message = "Tag name must be 1-50 characters"))]
    pub name: String,
}

/// Query string for listing notes
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NotesQuery {
    #[serde(default)]
    pub archived: bool,
}

/// Current time as stored in note timestamps
pub(crate) fn now() -> NaiveDateTime {
    Utc::now().naive_utc()
}
