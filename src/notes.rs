//! Note HTTP Handlers
//!
//! CRUD and tagging for the current user's notes. All routes require a
//! bearer token, and a note owned by another user answers 404 just like a
//! missing one.

use crate::error::AuthError;
use crate::extractors::{AuthUser, JsonBody, PathParam, QueryParams};
use crate::handlers::{AppState, NoteState};
use crate::middleware;
use crate::models::*;

use axum::{
    extract::State,
    http::StatusCode,
    middleware as axum_middleware,
    routing::{get, post},
    Json, Router,
};
use validator::Validate;

const NOT_FOUND_VIEW: &str = "Note not found or you don't have permission to view it";
const NOT_FOUND_EDIT: &str = "Note not found or you don't have permission to edit it";
const NOT_FOUND_DELETE: &str = "Note not found or you don't have permission to delete it";

fn not_found(note_id: i64, detail: &str) -> AuthError {
    tracing::warn!(note_id, "Note not found or not owned by user");
    AuthError::NotFound(detail.to_string())
}

/// Note routes, all behind [`middleware::require_auth`]
pub fn note_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/notes", get(list_notes).post(create_note))
        .route("/notes/", get(list_notes).post(create_note))
        .route(
            "/notes/:note_id",
            get(get_note).put(update_note).delete(delete_note),
        )
        .route("/notes/:note_id/tags", post(add_tags))
        .route_layer(axum_middleware::from_fn_with_state(
            state.auth.clone(),
            middleware::require_auth,
        ))
}

/// POST /notes - Create a note for the current user
pub async fn create_note(
    State(notes): State<NoteState>,
    AuthUser(user): AuthUser,
    JsonBody(fields): JsonBody<NoteFields>,
) -> Result<(StatusCode, Json<Note>), AuthError> {
    fields.validate()?;
    tracing::info!(username = %user.username, "Creating note");

    let note = notes.create(user.id, fields).await?;

    tracing::info!(note_id = note.id, "Note created");
    Ok((StatusCode::CREATED, Json(note)))
}

/// GET /notes?archived= - List the current user's notes
pub async fn list_notes(
    State(notes): State<NoteState>,
    AuthUser(user): AuthUser,
    QueryParams(query): QueryParams<NotesQuery>,
) -> Result<Json<Vec<Note>>, AuthError> {
    tracing::info!(
        username = %user.username,
        archived = query.archived,
        "Fetching notes"
    );

    let notes = notes.list(user.id, query.archived).await?;
    Ok(Json(notes))
}

/// GET /notes/:note_id
pub async fn get_note(
    State(notes): State<NoteState>,
    AuthUser(user): AuthUser,
    PathParam(note_id): PathParam<i64>,
) -> Result<Json<Note>, AuthError> {
    let note = notes
        .find(user.id, note_id)
        .await?
        .ok_or_else(|| not_found(note_id, NOT_FOUND_VIEW))?;

    Ok(Json(note))
}

/// PUT /notes/:note_id - Partial update; only the fields sent change
pub async fn update_note(
    State(notes): State<NoteState>,
    AuthUser(user): AuthUser,
    PathParam(note_id): PathParam<i64>,
    JsonBody(changes): JsonBody<NoteUpdate>,
) -> Result<Json<Note>, AuthError> {
    tracing::info!(note_id, username = %user.username, "Updating note");

    let existing = notes
        .find(user.id, note_id)
        .await?
        .ok_or_else(|| not_found(note_id, NOT_FOUND_EDIT))?;

    let fields = changes.apply(existing.fields());
    fields.validate()?;

    let note = notes
        .update(user.id, note_id, fields)
        .await?
        .ok_or_else(|| not_found(note_id, NOT_FOUND_EDIT))?;

    tracing::info!(note_id, "Note updated");
    Ok(Json(note))
}

/// DELETE /notes/:note_id
pub async fn delete_note(
    State(notes): State<NoteState>,
    AuthUser(user): AuthUser,
    PathParam(note_id): PathParam<i64>,
) -> Result<StatusCode, AuthError> {
    tracing::info!(note_id, username = %user.username, "Deleting note");

    if !notes.delete(user.id, note_id).await? {
        return Err(not_found(note_id, NOT_FOUND_DELETE));
    }

    tracing::info!(note_id, "Note deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// POST /notes/:note_id/tags - Body is a list of `{"name": ...}`
pub async fn add_tags(
    State(notes): State<NoteState>,
    AuthUser(user): AuthUser,
    PathParam(note_id): PathParam<i64>,
    JsonBody(tags): JsonBody<Vec<TagCreate>>,
) -> Result<Json<Note>, AuthError> {
    for tag in &tags {
        tag.validate()?;
    }
    tracing::info!(note_id, count = tags.len(), "Adding tags to note");

    let names: Vec<String> = tags.into_iter().map(|t| t.name).collect();
    let note = notes
        .add_tags(user.id, note_id, &names)
        .await?
        .ok_or_else(|| not_found(note_id, NOT_FOUND_EDIT))?;

    Ok(Json(note))
}
