pub mod auth;
pub mod comments;
pub mod error;
pub mod posts;
pub mod server;
pub mod users;

#[cfg(test)]
pub(crate) mod testing;
