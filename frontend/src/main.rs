use social_client::api::user::{DEFAULT_USER_ID, User};
use social_client::api::{ApiClient, ApiError};
use social_client::config::ClientConfig;
use social_client::view::UserView;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    tracing_subscriber::fmt::init();

    let config = ClientConfig::from_env();
    let api = ApiClient::new(&config)?;

    let mut view = UserView::new(api, DEFAULT_USER_ID);
    let mut updates = view.subscribe();

    println!("{}", view.render());
    view.activate();

    loop {
        tokio::select! {
            changed = updates.changed() => {
                // Closed means the fetch settled and nothing more will arrive.
                if changed.is_err() {
                    break;
                }
                println!("{}", view.render());

                if let Some(value) = view.current() {
                    match User::decode(&value) {
                        Ok(user) => info!("Showing {} <{}>", user.username, user.email),
                        Err(err) => warn!("Payload does not look like a user: {}", err),
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted, closing view");
                break;
            }
        }
    }

    Ok(())
}
