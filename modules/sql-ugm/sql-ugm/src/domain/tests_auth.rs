#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::Arc;

use sea_orm::ConnectionTrait;

use sql_ugm_sdk::{Criteria, PrincipalRef, SearchRequest, UgmClientV1, UgmError};
use ugm_db::TxMode;

use super::error::DomainError;
use super::local_client::UgmLocalClient;
use super::password::PasswordHasher;
use super::ugm::Ugm;
use crate::config::UgmConfig;
use crate::test_support::{attrs, build_factory, build_ugm, seed};

#[tokio::test]
async fn authenticate_checks_the_stored_hash() {
    let ugm = build_ugm(UgmConfig::default()).await;
    seed(&ugm).await;
    let users = ugm.users();

    // no password set yet
    assert!(!users.authenticate("phil", "secret").await.unwrap());

    users.passwd("phil", None, "secret").await.unwrap();
    assert!(users.authenticate("phil", "secret").await.unwrap());
    assert!(!users.authenticate("phil", "Secret").await.unwrap());
    assert!(!users.authenticate("phil", "").await.unwrap());
    assert!(!users.authenticate("", "secret").await.unwrap());
    assert!(!users.authenticate("nobody", "secret").await.unwrap());
}

#[tokio::test]
async fn passwd_requires_the_old_password() {
    let ugm = build_ugm(UgmConfig::default()).await;
    seed(&ugm).await;
    let users = ugm.users();
    users.passwd("donald", None, "first").await.unwrap();
    let before = users.get_hashed_pw("donald").await.unwrap();

    let err = users
        .passwd("donald", Some("wrong"), "second")
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::InvalidCredentials(_)));
    assert_eq!(users.get_hashed_pw("donald").await.unwrap(), before);

    users
        .passwd("donald", Some("first"), "second")
        .await
        .unwrap();
    assert!(users.authenticate("donald", "second").await.unwrap());
    assert!(!users.authenticate("donald", "first").await.unwrap());
}

#[tokio::test]
async fn passwd_rejects_unknown_users_and_unset_hashes() {
    let ugm = build_ugm(UgmConfig::default()).await;
    seed(&ugm).await;
    let users = ugm.users();

    let err = users.passwd("nobody", None, "x").await.unwrap_err();
    assert!(matches!(err, DomainError::InvalidCredentials(_)));

    let err = users.passwd("phil", Some("anything"), "x").await.unwrap_err();
    assert!(matches!(err, DomainError::InvalidCredentials(_)));
    assert_eq!(users.get_hashed_pw("phil").await.unwrap(), None);
}

#[tokio::test]
async fn user_node_changes_its_own_password() {
    let ugm = build_ugm(UgmConfig::default()).await;
    seed(&ugm).await;

    let mut phil = ugm.users().get("phil").await.unwrap();
    phil.passwd(None, "open sesame").await.unwrap();
    assert!(phil.record().row.password.is_some());
    assert!(phil.authenticate("open sesame").await.unwrap());
}

#[tokio::test]
async fn imported_hashes_verify() {
    let ugm = build_ugm(UgmConfig::default()).await;
    seed(&ugm).await;
    let users = ugm.users();

    let hashed = PasswordHasher::default().hash("imported");
    users
        .set_hashed_pw("donald", Some(hashed.clone()))
        .await
        .unwrap();
    assert_eq!(users.get_hashed_pw("donald").await.unwrap(), Some(hashed));
    assert!(users.authenticate("donald", "imported").await.unwrap());

    let err = users.set_hashed_pw("nobody", None).await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn successful_logins_are_stamped_when_enabled() {
    let config = UgmConfig {
        log_auth: true,
        ..UgmConfig::default()
    };
    let ugm = build_ugm(config).await;
    seed(&ugm).await;
    let users = ugm.users();
    users.passwd("phil", None, "secret").await.unwrap();

    assert!(!users.authenticate("phil", "wrong").await.unwrap());
    let phil = users.get("phil").await.unwrap();
    assert!(phil.record().row.first_login.is_none());

    assert!(users.authenticate("phil", "secret").await.unwrap());
    let first = users.get("phil").await.unwrap().record().row.clone();
    let stamped = first.first_login.expect("first login stamped");
    assert_eq!(first.last_login, Some(stamped));

    assert!(users.authenticate("phil", "secret").await.unwrap());
    let second = users.get("phil").await.unwrap().record().row.clone();
    assert_eq!(second.first_login, Some(stamped));
    assert!(second.last_login >= Some(stamped));
}

#[tokio::test]
async fn logins_are_not_stamped_by_default() {
    let ugm = build_ugm(UgmConfig::default()).await;
    seed(&ugm).await;
    let users = ugm.users();
    users.passwd("phil", None, "secret").await.unwrap();

    assert!(users.authenticate("phil", "secret").await.unwrap());
    let row = users.get("phil").await.unwrap().record().row.clone();
    assert!(row.first_login.is_none());
    assert!(row.last_login.is_none());
}

#[tokio::test]
async fn transaction_managed_apply_leaves_the_outcome_to_the_session_owner() {
    let factory = build_factory(TxMode::transaction_managed()).await;
    let tx_mode = factory.tx_mode();

    // flushed but never committed: closing the session discards it
    factory
        .scoped(move |session| async move {
            let ugm = Ugm::new(session, UgmConfig::default(), tx_mode);
            ugm.users().create("temp", attrs([])).await?;
            ugm.apply().await?;
            assert!(ugm.users().contains("temp").await?);
            Ok::<_, DomainError>(())
        })
        .await
        .unwrap();

    let session = factory.open();
    let ugm = Ugm::new(Arc::clone(&session), UgmConfig::default(), factory.tx_mode());
    assert!(!ugm.users().contains("temp").await.unwrap());

    // flipping the shared flag turns the next apply into a commit
    ugm.users().create("kept", attrs([])).await.unwrap();
    factory.tx_mode().set_transaction_managed(false);
    ugm.apply().await.unwrap();
    session.close().await.unwrap();

    let session = factory.open();
    let ugm = Ugm::new(session, UgmConfig::default(), factory.tx_mode());
    assert!(ugm.users().contains("kept").await.unwrap());
}

#[tokio::test]
async fn local_client_maps_domain_errors() {
    let ugm = build_ugm(UgmConfig::default()).await;
    seed(&ugm).await;
    let client: Arc<dyn UgmClientV1> = Arc::new(UgmLocalClient::new(Arc::new(ugm)));

    client.passwd("phil", None, "secret").await.unwrap();
    assert!(client.authenticate("phil", "secret").await.unwrap());
    assert_eq!(
        client.id_for_login("phil@example.com").await.unwrap(),
        "phil"
    );
    assert_eq!(
        client.group_ids("phil").await.unwrap(),
        vec!["admins", "staff"]
    );
    assert_eq!(
        client.member_ids("staff").await.unwrap(),
        vec!["donald", "phil"]
    );

    let staff = PrincipalRef::group("staff");
    client.add_role("Editor", &staff).await.unwrap();
    client
        .add_role("Owner", &PrincipalRef::user("donald"))
        .await
        .unwrap();
    assert_eq!(
        client.roles(&PrincipalRef::user("donald")).await.unwrap(),
        vec!["Editor", "Owner"]
    );
    client.remove_role("Editor", &staff).await.unwrap();
    assert!(client.roles(&staff).await.unwrap().is_empty());
    client.apply().await.unwrap();

    let found = client
        .search_groups(SearchRequest::new(Criteria::new().with("title", "Staff")).exact())
        .await
        .unwrap();
    assert_eq!(found.ids(), vec!["staff"]);

    let err = client.group_ids("nobody").await.unwrap_err();
    assert_eq!(err, UgmError::not_found("user", "nobody"));
    let err = client
        .passwd("phil", Some("wrong"), "x")
        .await
        .unwrap_err();
    assert!(matches!(err, UgmError::InvalidCredentials(_)));
    let err = client
        .search_users(SearchRequest::new(Criteria::new().with("id", "nobody")).exact())
        .await
        .unwrap_err();
    assert!(matches!(err, UgmError::Validation(_)));
}

#[tokio::test]
async fn backend_failures_surface_as_database_errors() {
    let ugm = Arc::new(build_ugm(UgmConfig::default()).await);
    seed(&ugm).await;
    {
        let tx = ugm.session().runner().await.unwrap();
        tx.execute_unprepared(r#"DROP TABLE "group_assignment""#)
            .await
            .unwrap();
    }
    let client = UgmLocalClient::new(Arc::clone(&ugm));

    let err = client.member_ids("staff").await.unwrap_err();
    assert!(matches!(err, UgmError::Database(_)), "{err:?}");

    ugm.session().close().await.unwrap();
    let err = client.member_ids("staff").await.unwrap_err();
    assert!(matches!(err, UgmError::Internal(_)), "{err:?}");
}
