use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use std::sync::Arc;
use tracing::info;

use crate::api::auth::hash_password;
use crate::api::error::ApiError;
use crate::api::server::AppState;
use crate::db::models::{NewUser, UserSchema, UserUpdate, is_valid_email};
use crate::db::repo;

fn check_email(email: &str) -> Result<(), ApiError> {
    if is_valid_email(email) {
        Ok(())
    } else {
        Err(ApiError::Validation(format!("Invalid email address: {email}")))
    }
}

pub async fn list_users(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<UserSchema>>, ApiError> {
    let users = repo::list_users(&state.db).await?;
    Ok(Json(users.into_iter().map(UserSchema::from).collect()))
}

pub async fn get_user(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<UserSchema>, ApiError> {
    let user = repo::get_user(&state.db, id).await?.ok_or(ApiError::NotFound("User"))?;
    Ok(Json(user.into()))
}

pub async fn create_user(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<NewUser>,
) -> Result<impl IntoResponse, ApiError> {
    check_email(&payload.email)?;

    if repo::find_by_username(&state.db, &payload.username).await?.is_some() {
        return Err(ApiError::Conflict("Username"));
    }
    if repo::find_by_email(&state.db, &payload.email).await?.is_some() {
        return Err(ApiError::Conflict("Email"));
    }

    let password_hash = hash_password(&payload.password).await?;
    let user = repo::insert_user(&state.db, &payload, &password_hash).await?;
    info!("Created user {} ({})", user.id, user.username);

    Ok((StatusCode::CREATED, Json(UserSchema::from(user))))
}

pub async fn update_user(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(changes): Json<UserUpdate>,
) -> Result<Json<UserSchema>, ApiError> {
    let mut user = repo::get_user(&state.db, id).await?.ok_or(ApiError::NotFound("User"))?;

    if let Some(username) = changes.username
        && username != user.username
    {
        if repo::find_by_username(&state.db, &username).await?.is_some() {
            return Err(ApiError::Conflict("Username"));
        }
        user.username = username;
    }
    if let Some(email) = changes.email
        && email != user.email
    {
        check_email(&email)?;
        if repo::find_by_email(&state.db, &email).await?.is_some() {
            return Err(ApiError::Conflict("Email"));
        }
        user.email = email;
    }
    if let Some(password) = changes.password {
        user.password_hash = hash_password(&password).await?;
    }
    if changes.bio.is_some() {
        user.bio = changes.bio;
    }
    if changes.profile_image_url.is_some() {
        user.profile_image_url = changes.profile_image_url;
    }
    if changes.cover_image_url.is_some() {
        user.cover_image_url = changes.cover_image_url;
    }
    if let Some(is_active) = changes.is_active {
        user.is_active = is_active;
    }
    if let Some(role) = changes.role {
        user.role = role;
    }

    let saved = repo::save_user(&state.db, &user).await?;
    Ok(Json(saved.into()))
}

pub async fn delete_user(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    if repo::delete_user(&state.db, id).await? {
        info!("Deleted user {}", id);
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound("User"))
    }
}

/// Stamps `last_login` with the current time.
pub async fn login_user(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<UserSchema>, ApiError> {
    let user = repo::record_login(&state.db, id)
        .await?
        .ok_or(ApiError::NotFound("User"))?;
    Ok(Json(user.into()))
}

#[cfg(test)]
mod tests {
    use crate::api::testing::{create_user as create, detail, send, test_app};
    use crate::db::repo;
    use argon2::{
        Argon2,
        password_hash::{PasswordHash, PasswordVerifier},
    };
    use axum::http::{Method, StatusCode};
    use chrono::{DateTime, Utc};
    use serde_json::json;

    #[tokio::test]
    async fn test_create_user() {
        let (app, _) = test_app().await;
        let (status, user) = send(
            &app,
            Method::POST,
            "/api/v1/users",
            Some(json!({
                "username": "newuser",
                "email": "newuser@example.com",
                "password": "password123",
                "bio": "I am a new user",
                "profile_image_url": "http://example.com/image.jpg",
                "cover_image_url": "http://example.com/cover.jpg"
            })),
        )
        .await;

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(user["username"], "newuser");
        assert_eq!(user["email"], "newuser@example.com");
        assert_eq!(user["bio"], "I am a new user");
        assert_eq!(user["profile_image_url"], "http://example.com/image.jpg");
        assert_eq!(user["cover_image_url"], "http://example.com/cover.jpg");
        assert_eq!(user["is_active"], true);
        assert_eq!(user["role"], "user");
        assert!(user.get("password").is_none());
        assert!(user.get("password_hash").is_none());
    }

    #[tokio::test]
    async fn test_timestamps_are_rfc3339() {
        let (app, _) = test_app().await;
        let user = create(&app, "ann", "ann@example.com").await;

        let created = user["created_at"].as_str().unwrap();
        let parsed: DateTime<Utc> = created.parse().unwrap();
        assert!(parsed <= Utc::now());
        assert!(user["updated_at"].as_str().unwrap().parse::<DateTime<Utc>>().is_ok());
        assert!(user["last_login"].is_null());
    }

    #[tokio::test]
    async fn test_get_users() {
        let (app, _) = test_app().await;
        let created = create(&app, "ann", "ann@example.com").await;

        let (status, users) = send(&app, Method::GET, "/api/v1/users", None).await;
        assert_eq!(status, StatusCode::OK);
        let users = users.as_array().unwrap();
        assert_eq!(users.len(), 1);
        assert_eq!(users[0]["id"], created["id"]);
        assert!(users[0].get("password_hash").is_none());
    }

    #[tokio::test]
    async fn test_get_user_by_id() {
        let (app, _) = test_app().await;
        let created = create(&app, "ann", "ann@example.com").await;
        let uri = format!("/api/v1/users/{}", created["id"]);

        let (status, user) = send(&app, Method::GET, &uri, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(user["username"], "ann");
        assert_eq!(user["bio"], "I am a test user");
        assert!(user.get("password_hash").is_none());
    }

    #[tokio::test]
    async fn test_get_nonexistent_user() {
        let (app, _) = test_app().await;
        let (status, body) = send(&app, Method::GET, "/api/v1/users/999", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(detail(&body).contains("not found"));
    }

    #[tokio::test]
    async fn test_create_user_duplicates() {
        let (app, _) = test_app().await;
        create(&app, "ann", "ann@example.com").await;

        let (status, body) = send(
            &app,
            Method::POST,
            "/api/v1/users",
            Some(json!({"username": "ann", "email": "different@example.com", "password": "pw"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(detail(&body).contains("already exists"));

        let (status, body) = send(
            &app,
            Method::POST,
            "/api/v1/users",
            Some(json!({"username": "differentuser", "email": "ann@example.com", "password": "pw"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["detail"], "Email already exists");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_duplicate_creates() {
        let (app, _) = test_app().await;
        let payload = |email: &str| {
            Some(json!({"username": "ann", "email": email, "password": "password123"}))
        };

        let (first, second) = tokio::join!(
            send(&app, Method::POST, "/api/v1/users", payload("ann1@example.com")),
            send(&app, Method::POST, "/api/v1/users", payload("ann2@example.com")),
        );

        let mut statuses = [first.0.as_u16(), second.0.as_u16()];
        statuses.sort();
        assert_eq!(statuses, [201, 400]);

        let rejected = if first.0 == StatusCode::BAD_REQUEST { first.1 } else { second.1 };
        assert_eq!(rejected["detail"], "Username already exists");
    }

    #[tokio::test]
    async fn test_create_user_invalid_email() {
        let (app, _) = test_app().await;
        let (status, _) = send(
            &app,
            Method::POST,
            "/api/v1/users",
            Some(json!({"username": "ann", "email": "not-an-email", "password": "pw"})),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_update_user() {
        let (app, _) = test_app().await;
        let created = create(&app, "ann", "ann@example.com").await;
        let uri = format!("/api/v1/users/{}", created["id"]);

        let (status, user) = send(
            &app,
            Method::PUT,
            &uri,
            Some(json!({
                "bio": "Updated bio",
                "profile_image_url": "http://example.com/new_image.jpg"
            })),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(user["id"], created["id"]);
        assert_eq!(user["username"], "ann");
        assert_eq!(user["email"], "ann@example.com");
        assert_eq!(user["bio"], "Updated bio");
        assert_eq!(user["profile_image_url"], "http://example.com/new_image.jpg");
    }

    #[tokio::test]
    async fn test_update_to_taken_username() {
        let (app, _) = test_app().await;
        create(&app, "ann", "ann@example.com").await;
        let bob = create(&app, "bob", "bob@example.com").await;
        let uri = format!("/api/v1/users/{}", bob["id"]);

        let (status, body) = send(&app, Method::PUT, &uri, Some(json!({"username": "ann"}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["detail"], "Username already exists");
    }

    #[tokio::test]
    async fn test_update_to_taken_email() {
        let (app, _) = test_app().await;
        create(&app, "ann", "ann@example.com").await;
        let bob = create(&app, "bob", "bob@example.com").await;
        let uri = format!("/api/v1/users/{}", bob["id"]);

        let (status, body) =
            send(&app, Method::PUT, &uri, Some(json!({"email": "ann@example.com"}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["detail"], "Email already exists");
    }

    #[tokio::test]
    async fn test_update_to_invalid_email() {
        let (app, _) = test_app().await;
        let ann = create(&app, "ann", "ann@example.com").await;
        let uri = format!("/api/v1/users/{}", ann["id"]);

        let (status, _) = send(&app, Method::PUT, &uri, Some(json!({"email": "nope"}))).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

        let (_, unchanged) = send(&app, Method::GET, &uri, None).await;
        assert_eq!(unchanged["email"], "ann@example.com");
    }

    #[tokio::test]
    async fn test_update_password_rehashes() {
        let (app, db) = test_app().await;
        let ann = create(&app, "ann", "ann@example.com").await;
        let id = ann["id"].as_i64().unwrap();
        let old_hash = repo::get_user(&db, id).await.unwrap().unwrap().password_hash;

        let (status, body) = send(
            &app,
            Method::PUT,
            &format!("/api/v1/users/{id}"),
            Some(json!({"password": "new-secret"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.get("password").is_none());
        assert!(body.get("password_hash").is_none());

        let new_hash = repo::get_user(&db, id).await.unwrap().unwrap().password_hash;
        assert_ne!(new_hash, old_hash);
        let parsed = PasswordHash::new(&new_hash).unwrap();
        let argon = Argon2::default();
        assert!(argon.verify_password(b"new-secret", &parsed).is_ok());
        assert!(argon.verify_password(b"password123", &parsed).is_err());
    }

    #[tokio::test]
    async fn test_update_nonexistent_user() {
        let (app, _) = test_app().await;
        let (status, body) = send(
            &app,
            Method::PUT,
            "/api/v1/users/999",
            Some(json!({"bio": "Updated bio"})),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(detail(&body).contains("not found"));
    }

    #[tokio::test]
    async fn test_delete_user() {
        let (app, _) = test_app().await;
        let created = create(&app, "todelete", "delete@example.com").await;
        let uri = format!("/api/v1/users/{}", created["id"]);

        let (status, _) = send(&app, Method::DELETE, &uri, None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (status, _) = send(&app, Method::GET, &uri, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = send(&app, Method::DELETE, "/api/v1/users/999", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_login_user() {
        let (app, _) = test_app().await;
        let created = create(&app, "ann", "ann@example.com").await;
        assert!(created["last_login"].is_null());
        let uri = format!("/api/v1/users/{}/login", created["id"]);

        let (status, user) = send(&app, Method::POST, &uri, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(user["id"], created["id"]);
        assert!(user["last_login"].as_str().unwrap().parse::<DateTime<Utc>>().is_ok());

        let (status, _) = send(&app, Method::POST, "/api/v1/users/999/login", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
