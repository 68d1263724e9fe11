//! Integration Tests - Use Cases over Mocked and Local Adapters
//!
//! Tests the interaction between usecases, ports, and adapters.
//! Uses mockall for trait mocking and tokio::test for async tests.

use std::sync::Arc;
use std::time::Duration;

use mockall::mock;
use serde_json::json;
use tokio_test::{assert_err, assert_ok};

use currency_converter::adapters::local::LocalAccounts;
use currency_converter::adapters::local::accounts::password_digest;
use currency_converter::adapters::metrics::MetricsRegistry;
use currency_converter::adapters::persistence::LocalDocumentStore;
use currency_converter::config::AccountConfig;
use currency_converter::domain::{AmountError, RateTable, find_currency};
use currency_converter::ports::document_store::{Direction, Document, DocumentStore, Query, StoredDocument};
use currency_converter::ports::identity::{AuthUser, IdentityProvider};
use currency_converter::usecases::{ConversionService, RateCatalog, SaveStatus, SessionError, SessionManager};

// ---- Mock Definitions ----

mock! {
    pub Identity {}

    #[async_trait::async_trait]
    impl IdentityProvider for Identity {
        async fn sign_in(&self, email: &str, password: &str) -> anyhow::Result<AuthUser>;
        async fn sign_out(&self) -> anyhow::Result<()>;
        async fn current_user(&self) -> Option<AuthUser>;
    }
}

mock! {
    pub Store {}

    #[async_trait::async_trait]
    impl DocumentStore for Store {
        async fn write_document(&self, collection: &str, key: &str, data: &Document)
            -> anyhow::Result<()>;
        async fn append_document(&self, collection: &str, data: &Document)
            -> anyhow::Result<String>;
        async fn get_document(&self, collection: &str, key: &str)
            -> anyhow::Result<Option<Document>>;
        async fn query_documents(&self, collection: &str, query: &Query)
            -> anyhow::Result<Vec<StoredDocument>>;
    }
}

// ---- Helpers ----

fn signed_in(uid: &'static str) -> MockIdentity {
    let mut identity = MockIdentity::new();
    identity.expect_current_user().returning(move || {
        Some(AuthUser {
            uid: uid.to_string(),
            email: Some("demo@example.com".to_string()),
        })
    });
    identity
}

fn metrics() -> Arc<MetricsRegistry> {
    Arc::new(MetricsRegistry::new().unwrap())
}

fn service(identity: MockIdentity, store: MockStore) -> ConversionService {
    ConversionService::new(
        RateTable::default(),
        Arc::new(identity),
        Arc::new(store),
        "conversions",
        metrics(),
    )
}

fn stored(id: &str, value: serde_json::Value) -> StoredDocument {
    StoredDocument {
        id: id.to_string(),
        data: value.as_object().unwrap().clone(),
    }
}

// ---- Conversion ----

#[tokio::test]
async fn test_conversion_record_is_appended_with_user() {
    let mut store = MockStore::new();
    store
        .expect_append_document()
        .withf(|collection, data| {
            collection == "conversions"
                && data.get("userId") == Some(&json!("u1"))
                && data.get("sourceCurrency") == Some(&json!("USD"))
                && data.get("targetCurrency") == Some(&json!("JPY"))
                && data.get("result") == Some(&json!(303.0))
        })
        .times(1)
        .returning(|_, _| Ok("doc-1".to_string()));

    let svc = service(signed_in("u1"), store);
    let usd = find_currency("USD").unwrap();
    let jpy = find_currency("JPY").unwrap();

    let outcome = svc.convert(2.0, usd, jpy).await;
    assert_eq!(outcome.save, SaveStatus::Saved { id: "doc-1".to_string() });
    assert_eq!(outcome.summary(), "2.00 USD equals 303.00 JPY");
    assert_eq!(outcome.notice(), "Conversion saved successfully");
}

#[tokio::test]
async fn test_failed_save_still_returns_result() {
    let mut store = MockStore::new();
    store
        .expect_append_document()
        .returning(|_, _| Err(anyhow::anyhow!("PERMISSION_DENIED")));

    let svc = service(signed_in("u1"), store);
    let usd = find_currency("USD").unwrap();
    let eur = find_currency("EUR").unwrap();

    let outcome = svc.convert_input("100", usd, eur).await.unwrap();
    assert_eq!(outcome.summary(), "100.00 USD equals 92.50 EUR");
    assert_eq!(outcome.notice(), "Failed to save conversion: PERMISSION_DENIED");
}

#[tokio::test]
async fn test_invalid_amount_never_reaches_store() {
    let mut store = MockStore::new();
    store.expect_append_document().never();

    let svc = service(signed_in("u1"), store);
    let usd = find_currency("USD").unwrap();
    let eur = find_currency("EUR").unwrap();

    assert!(svc.convert_input("", usd, eur).await.is_err());
    assert!(svc.convert_input("1,5", usd, eur).await.is_err());

    let huge = format!("9{}", "9".repeat(320));
    assert_eq!(
        svc.convert_input(&huge, usd, eur).await.unwrap_err(),
        AmountError::TooLarge
    );
}

#[tokio::test]
async fn test_history_query_shape_and_malformed_rows() {
    let mut store = MockStore::new();
    store
        .expect_query_documents()
        .withf(|collection, query| {
            let order = query.order_by.as_ref().unwrap();
            collection == "conversions"
                && query.filters.len() == 1
                && query.filters[0].field == "userId"
                && query.filters[0].value == json!("u1")
                && order.field == "timestamp"
                && order.direction == Direction::Descending
                && query.limit == Some(20)
        })
        .returning(|_, _| {
            Ok(vec![
                stored(
                    "b",
                    json!({
                        "userId": "u1", "timestamp": 2000, "amount": 10.0,
                        "sourceCurrency": "USD", "targetCurrency": "GBP", "result": 7.9
                    }),
                ),
                stored("broken", json!({"userId": "u1", "timestamp": "soon"})),
                stored(
                    "a",
                    json!({
                        "userId": "u1", "timestamp": 1000, "amount": 1.0,
                        "sourceCurrency": "USD", "targetCurrency": "PEN", "result": 3.7
                    }),
                ),
            ])
        });

    let svc = service(signed_in("u1"), store);
    let history = svc.history(20).await.unwrap();

    assert_eq!(history.len(), 2);
    assert_eq!(history[0].summary(), "10.00 USD equals 7.90 GBP");
    assert_eq!(history[1].summary(), "1.00 USD equals 3.70 PEN");
}

#[tokio::test]
async fn test_history_without_session_skips_store() {
    let mut identity = MockIdentity::new();
    identity.expect_current_user().returning(|| None);
    let mut store = MockStore::new();
    store.expect_query_documents().never();

    let svc = service(identity, store);
    let err = assert_err!(svc.history(20).await);
    assert_eq!(err.to_string(), "Sign in to see your conversion history");
}

// ---- Session ----

#[tokio::test]
async fn test_login_trims_email_and_reports_provider_error() {
    let mut identity = MockIdentity::new();
    identity
        .expect_sign_in()
        .withf(|email, password| email == "user@example.com" && password == "pw")
        .times(1)
        .returning(|_, _| Err(anyhow::anyhow!("Invalid email or password")));

    let sessions = SessionManager::new(Arc::new(identity), 5, metrics());
    let err = sessions.login("  user@example.com  ", "pw").await.unwrap_err();
    assert_eq!(err, SessionError::Provider("Invalid email or password".to_string()));
}

#[tokio::test]
async fn test_throttled_attempts_never_reach_provider() {
    let mut identity = MockIdentity::new();
    identity
        .expect_sign_in()
        .times(3)
        .returning(|_, _| Err(anyhow::anyhow!("Invalid email or password")));

    let sessions = SessionManager::new(Arc::new(identity), 3, metrics());
    for _ in 0..3 {
        assert!(matches!(
            sessions.login("a@b.c", "x").await,
            Err(SessionError::Provider(_))
        ));
    }
    assert_eq!(sessions.login("a@b.c", "x").await, Err(SessionError::TooManyAttempts));
}

#[tokio::test]
async fn test_blank_input_never_reaches_provider() {
    let mut identity = MockIdentity::new();
    identity.expect_sign_in().never();

    let sessions = SessionManager::new(Arc::new(identity), 5, metrics());
    assert_eq!(sessions.login("", "pw").await, Err(SessionError::BlankEmail));
    assert_eq!(sessions.login("a@b.c", "   ").await, Err(SessionError::BlankPassword));
}

// ---- Rate catalog ----

#[tokio::test]
async fn test_rate_catalog_writes_one_document_per_currency() {
    let mut store = MockStore::new();
    store
        .expect_write_document()
        .withf(|collection, key, data| {
            collection == "rates" && data.get("code") == Some(&json!(key))
        })
        .times(5)
        .returning(|_, _, _| Ok(()));

    let catalog = RateCatalog::new(RateTable::default(), Arc::new(store), "rates");
    assert_eq!(assert_ok!(catalog.publish().await), 5);
}

#[tokio::test]
async fn test_rate_catalog_propagates_store_errors() {
    let mut store = MockStore::new();
    store
        .expect_write_document()
        .returning(|_, _, _| Err(anyhow::anyhow!("unavailable")));

    let catalog = RateCatalog::new(RateTable::default(), Arc::new(store), "rates");
    assert_err!(catalog.publish().await);
}

// ---- End to end over local adapters ----

#[tokio::test]
async fn test_history_is_per_user_newest_first_and_limited() {
    let dir = std::env::temp_dir().join(format!("it-history-{}", uuid::Uuid::new_v4()));
    let store = Arc::new(
        LocalDocumentStore::from_data_dir(dir.to_str().unwrap())
            .await
            .unwrap(),
    );
    let accounts = Arc::new(
        LocalAccounts::from_config(&[
            AccountConfig {
                email: "one@example.com".to_string(),
                password_sha256: password_digest("pw1"),
                uid: Some("one".to_string()),
            },
            AccountConfig {
                email: "two@example.com".to_string(),
                password_sha256: password_digest("pw2"),
                uid: Some("two".to_string()),
            },
        ])
        .unwrap(),
    );
    let svc = ConversionService::new(
        RateTable::default(),
        accounts.clone(),
        store,
        "conversions",
        metrics(),
    );
    let usd = find_currency("USD").unwrap();
    let eur = find_currency("EUR").unwrap();

    accounts.sign_in("one@example.com", "pw1").await.unwrap();
    for amount in [1.0, 2.0, 3.0] {
        svc.convert(amount, usd, eur).await;
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    accounts.sign_in("two@example.com", "pw2").await.unwrap();
    svc.convert(50.0, usd, eur).await;

    let two = svc.history(10).await.unwrap();
    assert_eq!(two.len(), 1);
    assert_eq!(two[0].amount, 50.0);

    accounts.sign_in("one@example.com", "pw1").await.unwrap();
    let one = svc.history(2).await.unwrap();
    let amounts: Vec<f64> = one.iter().map(|r| r.amount).collect();
    assert_eq!(amounts, [3.0, 2.0]);

    let _ = tokio::fs::remove_dir_all(&dir).await;
}
