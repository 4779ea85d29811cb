use chrono::Utc;
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::str::FromStr;

use crate::db::models::{Comment, NewComment, NewPost, NewUser, Post, User};

const USER_COLUMNS: &str = "id, username, email, password_hash, bio, profile_image_url, \
    cover_image_url, is_active, role, last_login, created_at, updated_at";
const POST_COLUMNS: &str =
    "id, user_id, title, content, image_url, visibility, created_at, updated_at";
const COMMENT_COLUMNS: &str = "id, user_id, post_id, parent_id, content, created_at, updated_at";

/// Opens the pool and makes sure the schema exists.
///
/// Connections are kept alive for the life of the pool so that an
/// in-memory database is not lost when the pool goes idle.
pub async fn connect(database_url: &str) -> Result<SqlitePool, sqlx::Error> {
    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .min_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await?;

    create_tables(&pool).await?;
    Ok(pool)
}

pub async fn create_tables(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            username TEXT UNIQUE NOT NULL,
            email TEXT UNIQUE NOT NULL,
            password_hash TEXT NOT NULL,
            bio TEXT,
            profile_image_url TEXT,
            cover_image_url TEXT,
            is_active BOOLEAN NOT NULL DEFAULT 1,
            role TEXT NOT NULL DEFAULT 'user',
            last_login TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS posts (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            title TEXT,
            content TEXT NOT NULL,
            image_url TEXT,
            visibility TEXT NOT NULL DEFAULT 'public',
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS comments (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            post_id INTEGER NOT NULL REFERENCES posts(id) ON DELETE CASCADE,
            parent_id INTEGER REFERENCES comments(id) ON DELETE CASCADE,
            content TEXT NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

// Users

pub async fn list_users(pool: &SqlitePool) -> Result<Vec<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users ORDER BY id"))
        .fetch_all(pool)
        .await
}

pub async fn get_user(pool: &SqlitePool, id: i64) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?"))
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn find_by_username(
    pool: &SqlitePool,
    username: &str,
) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(&format!(
        "SELECT {USER_COLUMNS} FROM users WHERE username = ?"
    ))
    .bind(username)
    .fetch_optional(pool)
    .await
}

pub async fn find_by_email(pool: &SqlitePool, email: &str) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?"))
        .bind(email)
        .fetch_optional(pool)
        .await
}

pub async fn insert_user(
    pool: &SqlitePool,
    user: &NewUser,
    password_hash: &str,
) -> Result<User, sqlx::Error> {
    let now = Utc::now();
    let id = sqlx::query(
        r#"
        INSERT INTO users (username, email, password_hash, bio, profile_image_url,
                           cover_image_url, is_active, role, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&user.username)
    .bind(&user.email)
    .bind(password_hash)
    .bind(&user.bio)
    .bind(&user.profile_image_url)
    .bind(&user.cover_image_url)
    .bind(user.is_active)
    .bind(&user.role)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await?
    .last_insert_rowid();

    get_user(pool, id).await?.ok_or(sqlx::Error::RowNotFound)
}

/// Writes every mutable column of `user` back and bumps `updated_at`.
pub async fn save_user(pool: &SqlitePool, user: &User) -> Result<User, sqlx::Error> {
    sqlx::query(
        r#"
        UPDATE users
        SET username = ?, email = ?, password_hash = ?, bio = ?, profile_image_url = ?,
            cover_image_url = ?, is_active = ?, role = ?, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(&user.username)
    .bind(&user.email)
    .bind(&user.password_hash)
    .bind(&user.bio)
    .bind(&user.profile_image_url)
    .bind(&user.cover_image_url)
    .bind(user.is_active)
    .bind(&user.role)
    .bind(Utc::now())
    .bind(user.id)
    .execute(pool)
    .await?;

    get_user(pool, user.id).await?.ok_or(sqlx::Error::RowNotFound)
}

/// Returns false when there was no such user.
pub async fn delete_user(pool: &SqlitePool, id: i64) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM users WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

pub async fn record_login(pool: &SqlitePool, id: i64) -> Result<Option<User>, sqlx::Error> {
    let result = sqlx::query("UPDATE users SET last_login = ? WHERE id = ?")
        .bind(Utc::now())
        .bind(id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Ok(None);
    }
    get_user(pool, id).await
}

// Posts

pub async fn list_posts(pool: &SqlitePool) -> Result<Vec<Post>, sqlx::Error> {
    sqlx::query_as::<_, Post>(&format!("SELECT {POST_COLUMNS} FROM posts ORDER BY id"))
        .fetch_all(pool)
        .await
}

pub async fn list_posts_by_user(pool: &SqlitePool, user_id: i64) -> Result<Vec<Post>, sqlx::Error> {
    sqlx::query_as::<_, Post>(&format!(
        "SELECT {POST_COLUMNS} FROM posts WHERE user_id = ? ORDER BY id"
    ))
    .bind(user_id)
    .fetch_all(pool)
    .await
}

pub async fn get_post(pool: &SqlitePool, id: i64) -> Result<Option<Post>, sqlx::Error> {
    sqlx::query_as::<_, Post>(&format!("SELECT {POST_COLUMNS} FROM posts WHERE id = ?"))
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn insert_post(
    pool: &SqlitePool,
    user_id: i64,
    post: &NewPost,
) -> Result<Post, sqlx::Error> {
    let now = Utc::now();
    let id = sqlx::query(
        r#"
        INSERT INTO posts (user_id, title, content, image_url, visibility, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(user_id)
    .bind(&post.title)
    .bind(&post.content)
    .bind(&post.image_url)
    .bind(post.visibility)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await?
    .last_insert_rowid();

    get_post(pool, id).await?.ok_or(sqlx::Error::RowNotFound)
}

pub async fn save_post(pool: &SqlitePool, post: &Post) -> Result<Post, sqlx::Error> {
    sqlx::query(
        r#"
        UPDATE posts
        SET title = ?, content = ?, image_url = ?, visibility = ?, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(&post.title)
    .bind(&post.content)
    .bind(&post.image_url)
    .bind(post.visibility)
    .bind(Utc::now())
    .bind(post.id)
    .execute(pool)
    .await?;

    get_post(pool, post.id).await?.ok_or(sqlx::Error::RowNotFound)
}

/// Also removes the post's comments.
pub async fn delete_post(pool: &SqlitePool, id: i64) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM posts WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

// Comments

pub async fn list_comments(pool: &SqlitePool) -> Result<Vec<Comment>, sqlx::Error> {
    sqlx::query_as::<_, Comment>(&format!("SELECT {COMMENT_COLUMNS} FROM comments ORDER BY id"))
        .fetch_all(pool)
        .await
}

/// Top-level comments of a post; replies hang off their parent.
pub async fn list_post_comments(
    pool: &SqlitePool,
    post_id: i64,
) -> Result<Vec<Comment>, sqlx::Error> {
    sqlx::query_as::<_, Comment>(&format!(
        "SELECT {COMMENT_COLUMNS} FROM comments WHERE post_id = ? AND parent_id IS NULL ORDER BY id"
    ))
    .bind(post_id)
    .fetch_all(pool)
    .await
}

pub async fn list_replies(pool: &SqlitePool, parent_id: i64) -> Result<Vec<Comment>, sqlx::Error> {
    sqlx::query_as::<_, Comment>(&format!(
        "SELECT {COMMENT_COLUMNS} FROM comments WHERE parent_id = ? ORDER BY id"
    ))
    .bind(parent_id)
    .fetch_all(pool)
    .await
}

pub async fn get_comment(pool: &SqlitePool, id: i64) -> Result<Option<Comment>, sqlx::Error> {
    sqlx::query_as::<_, Comment>(&format!(
        "SELECT {COMMENT_COLUMNS} FROM comments WHERE id = ?"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await
}

pub async fn insert_comment(
    pool: &SqlitePool,
    user_id: i64,
    comment: &NewComment,
) -> Result<Comment, sqlx::Error> {
    let now = Utc::now();
    let id = sqlx::query(
        r#"
        INSERT INTO comments (user_id, post_id, parent_id, content, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(user_id)
    .bind(comment.post_id)
    .bind(comment.parent_id)
    .bind(&comment.content)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await?
    .last_insert_rowid();

    get_comment(pool, id).await?.ok_or(sqlx::Error::RowNotFound)
}

pub async fn save_comment(pool: &SqlitePool, comment: &Comment) -> Result<Comment, sqlx::Error> {
    sqlx::query("UPDATE comments SET content = ?, updated_at = ? WHERE id = ?")
        .bind(&comment.content)
        .bind(Utc::now())
        .bind(comment.id)
        .execute(pool)
        .await?;

    get_comment(pool, comment.id).await?.ok_or(sqlx::Error::RowNotFound)
}

/// Also removes replies to the comment.
pub async fn delete_comment(pool: &SqlitePool, id: i64) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM comments WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}
