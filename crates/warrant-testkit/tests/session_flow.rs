//! End-to-end login and renewal over the seeded newsroom graph.

use std::sync::Arc;
use std::time::Duration;

use warrant::{
    BroadcastObserver, ErrorCode, IssueKind, IssuerConfig, LoginOptions, SessionIssuer,
    WarrantConfig,
};
use warrant_core::{Permission, SessionId};
use warrant_keys::KeySource;
use warrant_store::{MemoryStore, SqliteStore, Store};
use warrant_testkit::fixtures::{CollidingStore, TestFixture, PASSWORD};
use warrant_testkit::vectors::{encrypted_pems, PASSPHRASE, PLAIN_PEM};

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

async fn assert_login_matches_graph<S: Store>(fixture: &TestFixture<S>) {
    let newsroom = fixture.seed_newsroom().await.unwrap();
    let issuer = fixture.issuer(IssuerConfig::default());
    let verifier = issuer.verifier();

    for user in [&newsroom.alice, &newsroom.bob, &newsroom.dave] {
        let expected = newsroom.expected(user.id);
        let payload = issuer
            .login(&user.username, PASSWORD, LoginOptions::default())
            .await
            .unwrap();
        assert_eq!(payload.permissions, expected, "{}", user.username);

        let claims = verifier.verify(&payload.token).unwrap();
        assert_eq!(claims.usr.id, user.id);
        assert_eq!(claims.usr.name, user.username);

        let latest = fixture.store.latest_bitmap().await.unwrap().unwrap();
        assert_eq!(claims.pbm.vers, latest.version);
        assert_eq!(claims.pbm.bits, latest.encode(&expected));
        assert_eq!(verifier.permissions_for(&claims).await.unwrap(), expected);
    }
}

#[tokio::test]
async fn test_newsroom_login_memory() {
    init_tracing();
    assert_login_matches_graph(&TestFixture::new()).await;
}

#[tokio::test]
async fn test_newsroom_login_sqlite() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let store = SqliteStore::open(dir.path().join("warrant.db")).unwrap();
    assert_login_matches_graph(&TestFixture::with_store(store)).await;
}

#[tokio::test]
async fn test_one_version_shared_until_permissions_change() {
    let fixture = TestFixture::new();
    fixture.seed_newsroom().await.unwrap();
    let issuer = fixture.issuer(IssuerConfig::default());

    let a = issuer.login("alice", PASSWORD, LoginOptions::default()).await.unwrap();
    let b = issuer.login("bob", PASSWORD, LoginOptions::default()).await.unwrap();
    let verifier = issuer.verifier();
    let a_claims = verifier.verify(&a.token).unwrap();
    let b_claims = verifier.verify(&b.token).unwrap();
    assert_eq!(a_claims.pbm.vers, b_claims.pbm.vers);

    fixture
        .store
        .insert_permission(&Permission::new("archive.read"))
        .await
        .unwrap();
    let c = issuer.login("alice", PASSWORD, LoginOptions::default()).await.unwrap();
    let c_claims = verifier.verify(&c.token).unwrap();
    assert_ne!(c_claims.pbm.vers, a_claims.pbm.vers);

    // Old tokens still decode against the version they were minted with.
    assert_eq!(
        verifier.permissions_for(&a_claims).await.unwrap(),
        a.permissions
    );
    assert_eq!(verifier.permissions_for(&c_claims).await.unwrap(), c.permissions);
}

#[tokio::test]
async fn test_deleting_permission_drops_its_grants() {
    let fixture = TestFixture::new();
    fixture.seed_newsroom().await.unwrap();
    let issuer = fixture.issuer(IssuerConfig::default());

    assert!(fixture.store.delete_permission("comments.moderate").await.unwrap());
    let payload = issuer.login("alice", PASSWORD, LoginOptions::default()).await.unwrap();
    assert_eq!(
        payload.permissions,
        vec!["articles.publish", "articles.read", "articles.write"]
    );
}

#[tokio::test]
async fn test_suspended_and_wrong_password() {
    let fixture = TestFixture::new();
    fixture.seed_newsroom().await.unwrap();
    let issuer = fixture.issuer(IssuerConfig::default());

    let err = issuer.login("carol", PASSWORD, LoginOptions::default()).await.unwrap_err();
    assert_eq!(err.code(), Some(ErrorCode::LoginSuspended));

    let err = issuer.login("dave", "wrong", LoginOptions::default()).await.unwrap_err();
    assert_eq!(err.code(), Some(ErrorCode::LoginFailed));

    let err = issuer.login("erin", PASSWORD, LoginOptions::default()).await.unwrap_err();
    assert_eq!(err.code(), Some(ErrorCode::UnknownUser));
}

#[tokio::test]
async fn test_padded_credentials_are_trimmed() {
    let fixture = TestFixture::new();
    fixture.seed_newsroom().await.unwrap();
    let issuer = fixture.issuer(IssuerConfig::default());

    let padded = format!("  {}  ", PASSWORD);
    let payload = issuer.login("  alice  ", &padded, LoginOptions::default()).await.unwrap();
    assert_eq!(payload.username, "alice");

    let err = issuer.login("alice", "   ", LoginOptions::default()).await.unwrap_err();
    assert_eq!(err.code(), Some(ErrorCode::MissingPassword));
}

#[tokio::test]
async fn test_unknown_stored_grant_mode_is_integrity_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("warrant.db");
    let fixture = TestFixture::with_store(SqliteStore::open(&path).unwrap());
    fixture.seed_newsroom().await.unwrap();

    let conn = rusqlite::Connection::open(&path).unwrap();
    conn.execute(
        "UPDATE grant_edges SET mode = 'maybe' WHERE permission = 'comments.moderate'",
        [],
    )
    .unwrap();
    drop(conn);

    let issuer = fixture.issuer(IssuerConfig::default());
    let err = issuer.login("alice", PASSWORD, LoginOptions::default()).await.unwrap_err();
    assert!(err.is_integrity(), "{}", err);
    assert_eq!(err.code(), None);

    // Users whose graph avoids the bad edge are unaffected.
    issuer.login("bob", PASSWORD, LoginOptions::default()).await.unwrap();
}

#[tokio::test]
async fn test_renewal_chain_is_persisted() {
    let fixture = TestFixture::new();
    fixture.seed_newsroom().await.unwrap();
    let issuer = fixture.issuer(IssuerConfig::default());

    let first = issuer
        .login("bob", PASSWORD, LoginOptions::valid_for(Duration::from_secs(120)))
        .await
        .unwrap();
    let second = issuer.renew_session(&first.id, LoginOptions::default()).await.unwrap();
    let third = issuer.renew_session(&second.id, LoginOptions::default()).await.unwrap();

    assert_eq!(first.expires_in, 120);
    assert_eq!(second.expires_in, 3600);
    assert_eq!(third.permissions, vec!["articles.read"]);

    for payload in [&first, &second, &third] {
        let stored = fixture
            .store
            .get_session(&SessionId::from(payload.id.as_str()))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.username, "bob");
        assert_eq!(stored.secret, payload.secret);
        assert_eq!(stored.issued_at, payload.issued_at);
        assert_eq!(
            stored.expires_at - stored.issued_at,
            payload.expires_in as i64 * 1000
        );
    }
}

#[tokio::test]
async fn test_renewal_picks_up_new_grants() {
    let fixture = TestFixture::new();
    let newsroom = fixture.seed_newsroom().await.unwrap();
    let issuer = fixture.issuer(IssuerConfig::default());

    let first = issuer.login("dave", PASSWORD, LoginOptions::default()).await.unwrap();
    assert!(first.permissions.is_empty());

    fixture
        .store
        .add_grant(&warrant_core::GrantEdge::allow(newsroom.dave.id, "admin.users", 0))
        .await
        .unwrap();
    let renewed = issuer.renew_session(&first.id, LoginOptions::default()).await.unwrap();
    assert_eq!(renewed.permissions, vec!["admin.users"]);
}

#[tokio::test]
async fn test_observer_sees_login_and_renewal() {
    let fixture = TestFixture::new();
    fixture.seed_newsroom().await.unwrap();
    let observer = Arc::new(BroadcastObserver::new(8));
    let mut rx = observer.subscribe();
    let issuer = fixture.issuer(IssuerConfig::default()).with_observer(observer);

    let login = issuer.login("alice", PASSWORD, LoginOptions::default()).await.unwrap();
    let renewal = issuer.renew_session(&login.id, LoginOptions::default()).await.unwrap();

    let event = rx.recv().await.unwrap();
    assert_eq!(event.kind, IssueKind::Login);
    assert_eq!(event.payload, login);

    let event = rx.recv().await.unwrap();
    assert_eq!(
        event.kind,
        IssueKind::Renewal {
            previous: login.id.clone()
        }
    );
    assert_eq!(event.payload, renewal);

    // Failed logins are not announced.
    let _ = issuer.login("alice", "wrong", LoginOptions::default()).await;
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn test_version_collisions_are_retried() {
    init_tracing();
    let fixture = TestFixture::with_store(CollidingStore::new(MemoryStore::new(), 3));
    fixture.seed_newsroom().await.unwrap();
    let issuer = fixture.issuer(IssuerConfig::default());

    let payload = issuer.login("alice", PASSWORD, LoginOptions::default()).await.unwrap();
    assert_eq!(fixture.store.attempts(), 4);

    let claims = issuer.verifier().verify(&payload.token).unwrap();
    let latest = fixture.store.latest_bitmap().await.unwrap().unwrap();
    assert_eq!(claims.pbm.vers, latest.version);
}

#[tokio::test]
async fn test_version_collisions_exhausted() {
    let fixture = TestFixture::with_store(CollidingStore::new(MemoryStore::new(), 10));
    fixture.seed_newsroom().await.unwrap();
    let config = IssuerConfig {
        max_version_attempts: 2,
        ..IssuerConfig::default()
    };
    let issuer = fixture.issuer(config);

    let err = issuer.login("alice", PASSWORD, LoginOptions::default()).await.unwrap_err();
    assert!(err.is_integrity());
    assert_eq!(fixture.store.attempts(), 2);
    assert!(fixture.store.inner().latest_bitmap().await.unwrap().is_none());
}

#[tokio::test]
async fn test_open_from_config() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let key_path = dir.path().join("key.pem");
    let encrypted = &encrypted_pems()[0];
    std::fs::write(&key_path, encrypted.pem).unwrap();

    let config = WarrantConfig {
        keys: KeySource::private(&key_path).with_passphrase(PASSPHRASE),
        database: Some(dir.path().join("warrant.db")),
        ..WarrantConfig::default()
    };
    let issuer: SessionIssuer<SqliteStore> = warrant::open(&config).unwrap();
    assert_eq!(issuer.keys().private_pem(), Some(PLAIN_PEM));

    let fixture = TestFixture {
        store: Arc::new(issuer.store().clone()),
        keys: Arc::new(issuer.keys().clone()),
    };
    fixture.seed_newsroom().await.unwrap();
    let payload = issuer.login("bob", PASSWORD, LoginOptions::default()).await.unwrap();
    drop(issuer);

    // Reopening sees the persisted session.
    let reopened = warrant::open(&config).unwrap();
    let stored = reopened
        .store()
        .get_session(&SessionId::from(payload.id.as_str()))
        .await
        .unwrap();
    assert_eq!(stored.unwrap().secret, payload.secret);
}

#[tokio::test]
async fn test_open_without_passphrase_fails() {
    let dir = tempfile::tempdir().unwrap();
    let key_path = dir.path().join("key.pem");
    std::fs::write(&key_path, encrypted_pems()[0].pem).unwrap();

    let config = WarrantConfig {
        keys: KeySource::private(&key_path),
        ..WarrantConfig::default()
    };
    let err = warrant::open(&config).err().unwrap();
    assert!(format!("{:#}", err).contains("failed to load key material"));
}
