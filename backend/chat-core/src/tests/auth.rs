use crate::auth::{AuthSessionProvider, SharedSessionProvider};
use crate::error::auth::AuthError;

use models::SessionCredential;

/// **VALUE**: Verifies the shared provider hands out whatever was stored last.
///
/// **WHY THIS MATTERS**: Reconnects re-read the provider, so a host that re-logs in
/// and calls `replace` must see the new token used on the next retry.
#[tokio::test]
async fn given_replaced_credential_when_reading_and_refreshing_then_latest_returned() {
    // GIVEN: A provider with t1, replaced by t2
    let provider = SharedSessionProvider::new(SessionCredential::from_parts("t1", Some("s1")));
    provider.replace(SessionCredential::from_parts("t2", Some("s1")));

    // WHEN: Reading and refreshing
    let current = provider.credential().unwrap();
    let refreshed = provider.refresh().await.unwrap();

    // THEN: Both reflect t2
    assert_eq!(current.token.as_str(), "t2");
    assert_eq!(current.session_id.as_deref(), Some("s1"));
    assert_eq!(refreshed.as_str(), "t2");
}

/// **VALUE**: Verifies that refresh after logout is denied.
///
/// **BUG THIS CATCHES**: Would catch the manager reconnecting with an empty token
/// after the user logged out.
#[tokio::test]
async fn given_cleared_provider_when_refreshing_then_refresh_denied() {
    let provider = SharedSessionProvider::new(SessionCredential::from_parts("t1", None));
    provider.clear();

    assert!(provider.credential().is_none());
    assert!(matches!(
        provider.refresh().await,
        Err(AuthError::RefreshDenied { .. })
    ));
}

/// **VALUE**: Verifies the credential never prints its token.
#[test]
fn given_credential_when_debug_formatted_then_token_redacted() {
    let credential = SessionCredential::from_parts("very-secret-token", Some("s1"));

    let printed = format!("{credential:?}");

    assert!(!printed.contains("very-secret-token"));
    assert!(printed.contains("s1"));
}
