use chrono::{Duration, Utc};
use gcal_events::components::google_calendar::token::{
    ClientSecret, TokenInfo, TokenManager, TokenStore, GOOGLE_TOKEN_URL,
};
use gcal_events::components::google_calendar::AccessTokenSource;
use gcal_events::error::Error;
use serde_json::json;
use tempfile::TempDir;
use wiremock::{
    matchers::{body_string_contains, method, path},
    Mock, MockServer, ResponseTemplate,
};

fn secret(token_uri: &str) -> ClientSecret {
    ClientSecret {
        client_id: "client-id".to_string(),
        client_secret: "client-secret".to_string(),
        auth_uri: "https://accounts.google.com/o/oauth2/auth".to_string(),
        token_uri: token_uri.to_string(),
    }
}

fn expired_token() -> TokenInfo {
    TokenInfo {
        access_token: "stale".to_string(),
        refresh_token: Some("refresh-me".to_string()),
        expires_at: Some(Utc::now() - Duration::minutes(5)),
        scope: None,
        token_type: Some("Bearer".to_string()),
    }
}

#[tokio::test]
async fn valid_cached_token_is_used_without_network() {
    let dir = TempDir::new().unwrap();
    let store = TokenStore::new(dir.path().join("token.json"));
    store
        .save(&TokenInfo {
            access_token: "fresh".to_string(),
            expires_at: Some(Utc::now() + Duration::hours(1)),
            ..expired_token()
        })
        .await
        .unwrap();

    // The token endpoint is unreachable on purpose
    let manager = TokenManager::with_secret(
        secret("http://127.0.0.1:9/token"),
        store,
        reqwest::Client::new(),
    );

    assert_eq!(manager.access_token().await.unwrap(), "fresh");
}

#[tokio::test]
async fn expired_token_is_refreshed_and_saved() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .and(body_string_contains("grant_type=refresh_token"))
        .and(body_string_contains("refresh_token=refresh-me"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "renewed",
            "expires_in": 3599,
            "token_type": "Bearer"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let token_path = dir.path().join("token.json");
    TokenStore::new(&token_path)
        .save(&expired_token())
        .await
        .unwrap();

    let manager = TokenManager::with_secret(
        secret(&format!("{}/token", server.uri())),
        TokenStore::new(&token_path),
        reqwest::Client::new(),
    );

    assert_eq!(manager.access_token().await.unwrap(), "renewed");
    // Served from memory the second time
    assert_eq!(manager.access_token().await.unwrap(), "renewed");

    let saved = TokenStore::new(&token_path).load().await.unwrap().unwrap();
    assert_eq!(saved.access_token, "renewed");
    assert_eq!(saved.refresh_token.as_deref(), Some("refresh-me"));
    assert!(!saved.is_expired());
}

#[tokio::test]
async fn rejected_refresh_is_a_credential_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": "invalid_grant"
        })))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let store = TokenStore::new(dir.path().join("token.json"));
    store.save(&expired_token()).await.unwrap();

    let manager = TokenManager::with_secret(
        secret(&format!("{}/token", server.uri())),
        store,
        reqwest::Client::new(),
    );

    match manager.access_token().await {
        Err(Error::Credential(message)) => assert!(message.contains("invalid_grant")),
        other => panic!("expected credential error, got {:?}", other),
    }
}

#[tokio::test]
async fn missing_token_without_browser_flow_fails() {
    let dir = TempDir::new().unwrap();
    let manager = TokenManager::with_secret(
        secret(GOOGLE_TOKEN_URL),
        TokenStore::new(dir.path().join("token.json")),
        reqwest::Client::new(),
    );

    assert!(matches!(
        manager.acquire().await,
        Err(Error::Credential(_))
    ));
}

#[tokio::test]
async fn token_cache_creates_its_directory_and_reports_corruption() {
    let dir = TempDir::new().unwrap();
    let store = TokenStore::new(dir.path().join("google_auth").join("token.json"));
    assert!(store.load().await.unwrap().is_none());

    store.save(&expired_token()).await.unwrap();
    let cached = store.load().await.unwrap().unwrap();
    assert_eq!(cached.access_token, "stale");
    assert_eq!(cached.refresh_token.as_deref(), Some("refresh-me"));

    tokio::fs::write(store.path(), "{ not json").await.unwrap();
    assert!(matches!(store.load().await, Err(Error::Credential(_))));
}
