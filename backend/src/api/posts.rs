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
use crate::db::models::{AuthorQuery, NewPost, Post, PostUpdate, PostWithUser};
use crate::db::repo;

pub async fn list_posts(State(state): State<Arc<AppState>>) -> Result<Json<Vec<Post>>, ApiError> {
    Ok(Json(repo::list_posts(&state.db).await?))
}

/// `GET /users/{id}/posts`
pub async fn list_user_posts(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<i64>,
) -> Result<Json<Vec<Post>>, ApiError> {
    if repo::get_user(&state.db, user_id).await?.is_none() {
        return Err(ApiError::NotFound("User"));
    }
    Ok(Json(repo::list_posts_by_user(&state.db, user_id).await?))
}

pub async fn get_post(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<PostWithUser>, ApiError> {
    let post = repo::get_post(&state.db, id)
        .await?
        .ok_or(ApiError::NotFound("Post"))?;
    let user = repo::get_user(&state.db, post.user_id)
        .await?
        .ok_or(ApiError::NotFound("User"))?;

    Ok(Json(PostWithUser {
        post,
        user: user.into(),
    }))
}

pub async fn create_post(
    State(state): State<Arc<AppState>>,
    Query(author): Query<AuthorQuery>,
    Json(payload): Json<NewPost>,
) -> Result<impl IntoResponse, ApiError> {
    if repo::get_user(&state.db, author.user_id).await?.is_none() {
        return Err(ApiError::NotFound("User"));
    }

    let post = repo::insert_post(&state.db, author.user_id, &payload).await?;
    info!("User {} created post {}", author.user_id, post.id);

    Ok((StatusCode::CREATED, Json(post)))
}

pub async fn update_post(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(changes): Json<PostUpdate>,
) -> Result<Json<Post>, ApiError> {
    let mut post = repo::get_post(&state.db, id)
        .await?
        .ok_or(ApiError::NotFound("Post"))?;

    if changes.title.is_some() {
        post.title = changes.title;
    }
    if let Some(content) = changes.content {
        post.content = content;
    }
    if changes.image_url.is_some() {
        post.image_url = changes.image_url;
    }
    if let Some(visibility) = changes.visibility {
        post.visibility = visibility;
    }

    Ok(Json(repo::save_post(&state.db, &post).await?))
}

pub async fn delete_post(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    if repo::delete_post(&state.db, id).await? {
        info!("Deleted post {}", id);
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound("Post"))
    }
}
