use serde_json::Value;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::api::ApiClient;
use crate::api::user::get_user;

pub const TITLE: &str = "Facebook Clone";

/// Renders the page for a given user payload. `None` shows as `null`.
pub fn render(user: Option<&Value>) -> String {
    // Serialising a `Value` cannot fail, so the fallback is never taken.
    let body = serde_json::to_string_pretty(&user).unwrap_or_else(|_| "null".to_string());
    format!("{TITLE}\n\n{body}")
}

/// Profile page: fetches one user the first time it is activated and shows
/// whatever came back.
///
/// The fetch runs as a spawned task owning the only writer of the state, so
/// nothing else can change what is displayed. Dropping the view aborts a
/// fetch that has not finished yet.
pub struct UserView {
    api: ApiClient,
    user_id: i64,
    state: watch::Receiver<Option<Value>>,
    writer: Option<watch::Sender<Option<Value>>>,
    task: Option<JoinHandle<()>>,
}

impl UserView {
    pub fn new(api: ApiClient, user_id: i64) -> Self {
        let (writer, state) = watch::channel(None);
        Self {
            api,
            user_id,
            state,
            writer: Some(writer),
            task: None,
        }
    }

    pub fn user_id(&self) -> i64 {
        self.user_id
    }

    /// Starts the fetch. Only the first call does anything.
    pub fn activate(&mut self) {
        let Some(writer) = self.writer.take() else {
            return;
        };

        let api = self.api.clone();
        let id = self.user_id;
        debug!("Fetching user {} from {}", id, api.base_url());

        self.task = Some(tokio::spawn(async move {
            match get_user(&api, id).await {
                Ok(user) => {
                    info!("Loaded user {}", id);
                    writer.send_replace(Some(user));
                }
                // Display stays empty; there is nothing to show the error in.
                Err(err) => warn!("Failed to load user {}: {}", id, err),
            }
        }));
    }

    pub fn is_activated(&self) -> bool {
        self.writer.is_none()
    }

    pub fn current(&self) -> Option<Value> {
        self.state.borrow().clone()
    }

    /// Fires once the displayed value changes, i.e. when a re-render is due.
    /// Reports closed once the fetch has settled.
    pub fn subscribe(&self) -> watch::Receiver<Option<Value>> {
        self.state.clone()
    }

    pub fn render(&self) -> String {
        render(self.state.borrow().as_ref())
    }

    /// Waits for the fetch to finish, successfully or not.
    pub async fn settled(&mut self) {
        if let Some(task) = self.task.as_mut() {
            if let Err(err) = task.await
                && err.is_panic()
            {
                warn!("User fetch task panicked");
            }
            self.task = None;
        }
    }
}

impl Drop for UserView {
    fn drop(&mut self) {
        if let Some(task) = &self.task {
            task.abort();
        }
    }
}
