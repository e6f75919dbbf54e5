//! Auth session flows against the mock backend, persisted in a file store.

mod common;

use assert_matches::assert_matches;
use common::spawn_backend;
use tidemark_client::session::{AuthSession, AUTH_TOKEN_KEY, NICKNAME_KEY};
use tidemark_client::store::{FileStore, KeyValueStore};
use tidemark_client::{ClientError, Identity, RejectCode};

#[tokio::test]
async fn register_stores_token_and_nickname() {
    let backend = spawn_backend().await;
    let dir = tempfile::tempdir().unwrap();
    let store = FileStore::new(dir.path());

    let mut session = AuthSession::load(backend.api(), store.clone()).unwrap();
    let user = session
        .register("선장_01", "harbor123", "harbor123")
        .await
        .unwrap();

    assert_eq!(user.nickname, "선장_01");
    assert_eq!(store.get(AUTH_TOKEN_KEY).unwrap().as_deref(), Some("token-선장_01"));
    assert_eq!(store.get(NICKNAME_KEY).unwrap().as_deref(), Some("선장_01"));
    assert_eq!(
        session.identity(),
        Some(Identity::signed_in("선장_01", "token-선장_01"))
    );
}

#[tokio::test]
async fn duplicate_registration_is_rejected_with_code() {
    let backend = spawn_backend().await;
    let dir = tempfile::tempdir().unwrap();
    let mut session = AuthSession::load(backend.api(), FileStore::new(dir.path())).unwrap();

    session.register("sailor", "harbor123", "harbor123").await.unwrap();
    let err = session
        .register("sailor", "harbor456", "harbor456")
        .await
        .unwrap_err();

    assert_eq!(err.reject_code(), Some(&RejectCode::NicknameTaken));
}

#[tokio::test]
async fn legacy_account_must_set_password_before_login() {
    let backend = spawn_backend().await;
    backend.state.add_legacy_account("oldsalt");
    let dir = tempfile::tempdir().unwrap();
    let mut session = AuthSession::load(backend.api(), FileStore::new(dir.path())).unwrap();

    let err = session.login("oldsalt", "harbor123").await.unwrap_err();
    assert_matches!(
        err,
        ClientError::Rejected { code: RejectCode::PasswordNotSet, .. }
    );

    session
        .set_password("oldsalt", "harbor123", "harbor123")
        .await
        .unwrap();
    let err = session
        .set_password("oldsalt", "harbor999", "harbor999")
        .await
        .unwrap_err();
    assert_eq!(err.reject_code(), Some(&RejectCode::PasswordAlreadySet));

    session.logout().unwrap();
    let user = session.login("oldsalt", "harbor123").await.unwrap();
    assert_eq!(user.nickname, "oldsalt");
}

#[tokio::test]
async fn unknown_nickname_and_wrong_password() {
    let backend = spawn_backend().await;
    let dir = tempfile::tempdir().unwrap();
    let mut session = AuthSession::load(backend.api(), FileStore::new(dir.path())).unwrap();

    let err = session.login("ghost", "harbor123").await.unwrap_err();
    assert_eq!(err.reject_code(), Some(&RejectCode::NicknameNotFound));

    session.register("sailor", "harbor123", "harbor123").await.unwrap();
    let err = session.login("sailor", "harbor000").await.unwrap_err();
    assert_eq!(err.reject_code(), Some(&RejectCode::InvalidCredentials));
}

#[tokio::test]
async fn resume_in_a_new_process_confirms_token() {
    let backend = spawn_backend().await;
    let dir = tempfile::tempdir().unwrap();

    let mut first = AuthSession::load(backend.api(), FileStore::new(dir.path())).unwrap();
    first.register("sailor", "harbor123", "harbor123").await.unwrap();

    let mut second = AuthSession::load(backend.api(), FileStore::new(dir.path())).unwrap();
    assert!(second.user().is_none());
    let user = second.resume().await.unwrap().expect("token accepted");
    assert_eq!(user.nickname, "sailor");
    assert_eq!(second.user(), Some(&user));
}

#[tokio::test]
async fn resume_discards_rejected_token() {
    let backend = spawn_backend().await;
    let dir = tempfile::tempdir().unwrap();
    let store = FileStore::new(dir.path());
    store.set(AUTH_TOKEN_KEY, "token-nobody").unwrap();
    store.set(NICKNAME_KEY, "nobody").unwrap();

    let mut session = AuthSession::load(backend.api(), store.clone()).unwrap();
    assert_eq!(session.resume().await.unwrap(), None);
    assert!(!session.is_authenticated());
    assert_eq!(store.get(AUTH_TOKEN_KEY).unwrap(), None);
    // The nickname stays usable as a legacy identity.
    assert_eq!(session.identity(), Some(Identity::legacy("nobody")));
}
