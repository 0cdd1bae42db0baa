//! Command-line host: restores (or opens) a session, prints the menu and
//! optionally checks access to one page.

use std::sync::Arc;

use anyhow::Context;

use arkedia_client::access_guard::GuardView;
use arkedia_client::{
    AccessGuard, ApiClient, AuthSession, ClientConfig, Credentials, FileTokenStore, HistoryNavigator, Navigator,
    NavigationComposer, PermissionResolver, PermissionTracker, ReqwestTransport, TracingNotifier,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    arkedia_observability::init();

    let config = ClientConfig::from_env().context("invalid client configuration")?;
    tracing::info!(api_url = %config.api_url, "starting Arkedia client");

    let store = match &config.session_file {
        Some(path) => FileTokenStore::new(path),
        None => FileTokenStore::in_data_dir().context("no location for the session file")?,
    };
    tracing::debug!(path = ?store.path(), "using session file");

    let client = ApiClient::new(Arc::new(ReqwestTransport::new(config)?));
    let navigator = Arc::new(HistoryNavigator::default());
    let session = AuthSession::new(
        client.clone(),
        Arc::new(store),
        Arc::new(TracingNotifier),
        navigator.clone(),
    );

    let restored = session.bootstrap();
    if !restored.is_authenticated() {
        match (std::env::var("ARKEDIA_EMAIL"), std::env::var("ARKEDIA_PASSWORD")) {
            (Ok(email), Ok(password)) => {
                session.login(&Credentials::new(email, password)).await?;
            }
            _ => tracing::info!("not logged in; set ARKEDIA_EMAIL and ARKEDIA_PASSWORD to log in"),
        }
    }

    let user = session.current_user();
    let menu = NavigationComposer::new(client.clone()).compose(user.as_ref()).await;
    tracing::info!(menu = %serde_json::to_string(&menu)?, "navigation");

    if let Ok(page_url) = std::env::var("ARKEDIA_PAGE_URL") {
        let resolver = PermissionResolver::new(client);
        let tracker = PermissionTracker::new();
        let view = AccessGuard::for_page(&page_url)
            .protect(&resolver, &tracker, user.as_ref(), navigator.as_ref(), || "page", None)
            .await;

        match view {
            GuardView::Loading => tracing::info!(%page_url, "permissions still loading"),
            GuardView::Children(_) => tracing::info!(%page_url, rights = ?tracker.state(), "access granted"),
            GuardView::Fallback(_) => tracing::info!(%page_url, "page visible but a capability is missing"),
            GuardView::Redirected(_) => tracing::info!(
                %page_url,
                redirect = %navigator.current_route(),
                "{}",
                arkedia_client::access_guard::ACCESS_DENIED_MESSAGE
            ),
        }
    }

    session.teardown();
    Ok(())
}
