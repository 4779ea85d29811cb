use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use std::sync::Arc;
use tracing::info;

use crate::api::error::ApiError;
use crate::api::server::AppState;
use crate::db::models::{AuthorQuery, Comment, CommentUpdate, CommentWithUser, NewComment};
use crate::db::repo;

pub async fn list_comments(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Comment>>, ApiError> {
    Ok(Json(repo::list_comments(&state.db).await?))
}

/// `GET /posts/{id}/comments`: top-level comments only.
pub async fn list_post_comments(
    State(state): State<Arc<AppState>>,
    Path(post_id): Path<i64>,
) -> Result<Json<Vec<Comment>>, ApiError> {
    if repo::get_post(&state.db, post_id).await?.is_none() {
        return Err(ApiError::NotFound("Post"));
    }
    Ok(Json(repo::list_post_comments(&state.db, post_id).await?))
}

pub async fn list_replies(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<Vec<Comment>>, ApiError> {
    if repo::get_comment(&state.db, id).await?.is_none() {
        return Err(ApiError::NotFound("Comment"));
    }
    Ok(Json(repo::list_replies(&state.db, id).await?))
}

pub async fn get_comment(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<CommentWithUser>, ApiError> {
    let comment = repo::get_comment(&state.db, id)
        .await?
        .ok_or(ApiError::NotFound("Comment"))?;
    let user = repo::get_user(&state.db, comment.user_id)
        .await?
        .ok_or(ApiError::NotFound("User"))?;

    Ok(Json(CommentWithUser {
        comment,
        user: user.into(),
    }))
}

pub async fn create_comment(
    State(state): State<Arc<AppState>>,
    Query(author): Query<AuthorQuery>,
    Json(payload): Json<NewComment>,
) -> Result<impl IntoResponse, ApiError> {
    if repo::get_user(&state.db, author.user_id).await?.is_none() {
        return Err(ApiError::NotFound("User"));
    }
    if repo::get_post(&state.db, payload.post_id).await?.is_none() {
        return Err(ApiError::NotFound("Post"));
    }
    if let Some(parent_id) = payload.parent_id {
        let parent = repo::get_comment(&state.db, parent_id)
            .await?
            .ok_or(ApiError::NotFound("Parent comment"))?;
        // A reply lives on the same post as the comment it answers.
        if parent.post_id != payload.post_id {
            return Err(ApiError::Validation(format!(
                "Parent comment {} belongs to another post",
                parent_id
            )));
        }
    }

    let comment = repo::insert_comment(&state.db, author.user_id, &payload).await?;
    info!(
        "User {} commented {} on post {}",
        author.user_id, comment.id, comment.post_id
    );

    Ok((StatusCode::CREATED, Json(comment)))
}

pub async fn update_comment(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(changes): Json<CommentUpdate>,
) -> Result<Json<Comment>, ApiError> {
    let mut comment = repo::get_comment(&state.db, id)
        .await?
        .ok_or(ApiError::NotFound("Comment"))?;

    if let Some(content) = changes.content {
        comment.content = content;
    }

    Ok(Json(repo::save_comment(&state.db, &comment).await?))
}

pub async fn delete_comment(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    if repo::delete_comment(&state.db, id).await? {
        info!("Deleted comment {}", id);
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound("Comment"))
    }
}
