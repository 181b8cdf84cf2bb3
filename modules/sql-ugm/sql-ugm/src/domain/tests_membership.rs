#![allow(clippy::unwrap_used, clippy::expect_used)]

use sea_orm::{ConnectionTrait, EntityTrait, PaginatorTrait};
use sql_ugm_sdk::{AttrValue, PrincipalKind, PrincipalRef};

use super::error::DomainError;
use super::node::PrincipalNode;
use super::ugm::UgmChild;
use crate::config::UgmConfig;
use crate::infra::storage::entity::group_assignment;
use crate::test_support::{attrs, build_ugm, seed};

async fn edge_count(ugm: &super::Ugm) -> u64 {
    let tx = ugm.session().runner().await.unwrap();
    group_assignment::Entity::find().count(&*tx).await.unwrap()
}

#[tokio::test]
async fn membership_is_visible_from_both_sides() {
    let ugm = build_ugm(UgmConfig::default()).await;
    seed(&ugm).await;

    let phil = ugm.users().get("phil").await.unwrap();
    assert_eq!(phil.group_ids().await.unwrap(), vec!["admins", "staff"]);

    let staff = ugm.groups().get("staff").await.unwrap();
    assert_eq!(staff.member_ids().await.unwrap(), vec!["donald", "phil"]);
    assert!(staff.contains("donald").await.unwrap());

    let admins = ugm.groups().get("admins").await.unwrap();
    assert!(!admins.contains("donald").await.unwrap());
    let member = admins.get("phil").await.unwrap();
    assert_eq!(member.id(), "phil");
}

#[tokio::test]
async fn adding_twice_keeps_one_edge() {
    let ugm = build_ugm(UgmConfig::default()).await;
    seed(&ugm).await;

    let staff = ugm.groups().get("staff").await.unwrap();
    staff.add("phil").await.unwrap();
    assert_eq!(staff.member_ids().await.unwrap(), vec!["donald", "phil"]);
    assert_eq!(edge_count(&ugm).await, 3);
}

#[tokio::test]
async fn unknown_members_are_not_found() {
    let ugm = build_ugm(UgmConfig::default()).await;
    seed(&ugm).await;
    let admins = ugm.groups().get("admins").await.unwrap();

    let err = admins.add("nobody").await.unwrap_err();
    assert!(matches!(err, DomainError::NotFound { kind: "user", .. }));

    let err = admins.get("donald").await.unwrap_err();
    assert!(matches!(err, DomainError::NotFound { kind: "membership", .. }));

    let err = admins.remove("donald").await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn removing_a_member_deletes_only_that_edge() {
    let ugm = build_ugm(UgmConfig::default()).await;
    seed(&ugm).await;

    let staff = ugm.groups().get("staff").await.unwrap();
    staff.remove("phil").await.unwrap();

    assert_eq!(staff.member_ids().await.unwrap(), vec!["donald"]);
    let phil = ugm.users().get("phil").await.unwrap();
    assert_eq!(phil.group_ids().await.unwrap(), vec!["admins"]);
}

#[tokio::test]
async fn deleting_a_user_cascades_to_edges() {
    let ugm = build_ugm(UgmConfig::default()).await;
    seed(&ugm).await;

    ugm.users().remove("phil").await.unwrap();
    ugm.apply().await.unwrap();

    assert!(!ugm.users().contains("phil").await.unwrap());
    let staff = ugm.groups().get("staff").await.unwrap();
    assert_eq!(staff.member_ids().await.unwrap(), vec!["donald"]);
    let admins = ugm.groups().get("admins").await.unwrap();
    assert!(admins.member_ids().await.unwrap().is_empty());
    assert_eq!(edge_count(&ugm).await, 1);
}

#[tokio::test]
async fn deleting_a_group_cascades_to_edges() {
    let ugm = build_ugm(UgmConfig::default()).await;
    seed(&ugm).await;

    ugm.groups().remove("staff").await.unwrap();

    let donald = ugm.users().get("donald").await.unwrap();
    assert!(donald.group_ids().await.unwrap().is_empty());
    assert_eq!(edge_count(&ugm).await, 1);

    let err = ugm.groups().remove("staff").await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn user_roles_union_own_and_group_roles() {
    let ugm = build_ugm(UgmConfig::default()).await;
    seed(&ugm).await;

    let mut staff = ugm.groups().get("staff").await.unwrap();
    ugm.add_role("Editor", &mut staff).await.unwrap();
    let mut admins = ugm.groups().get("admins").await.unwrap();
    ugm.add_role("Manager", &mut admins).await.unwrap();
    let mut phil = ugm.users().get("phil").await.unwrap();
    ugm.add_role("Viewer", &mut phil).await.unwrap();
    ugm.add_role("Editor", &mut phil).await.unwrap();

    assert_eq!(
        ugm.roles(&phil).await.unwrap(),
        vec!["Editor", "Manager", "Viewer"]
    );
    assert_eq!(admins.roles().await.unwrap(), vec!["Manager"]);

    // membership changes show up on the next call
    admins.remove("phil").await.unwrap();
    assert_eq!(phil.roles().await.unwrap(), vec!["Editor", "Viewer"]);
}

#[tokio::test]
async fn role_edits_are_idempotent() {
    let ugm = build_ugm(UgmConfig::default()).await;
    seed(&ugm).await;

    let mut donald = ugm.users().get("donald").await.unwrap();
    donald.add_role("Viewer").await.unwrap();
    donald.add_role("Viewer").await.unwrap();
    donald.remove_role("Owner").await.unwrap();
    assert_eq!(donald.own_roles(), vec!["Viewer"]);

    donald.refresh().await.unwrap();
    assert_eq!(donald.own_roles(), vec!["Viewer"]);

    donald.remove_role("Viewer").await.unwrap();
    let reloaded = ugm.users().get("donald").await.unwrap();
    assert!(reloaded.own_roles().is_empty());
}

#[tokio::test]
async fn views_of_one_user_keep_each_others_writes() {
    let config = UgmConfig {
        log_auth: true,
        ..UgmConfig::default()
    };
    let ugm = build_ugm(config).await;
    seed(&ugm).await;

    let mut a = ugm.users().get("phil").await.unwrap();
    let mut b = ugm.users().get("phil").await.unwrap();

    a.set_attr("nickname", "flip").await.unwrap();
    b.add_role("Editor").await.unwrap();
    a.add_role("Viewer").await.unwrap();
    b.set_attr("fullname", "Phil B").await.unwrap();
    assert_eq!(a.own_roles(), vec!["Editor", "Viewer"]);

    let reloaded = ugm.users().get("phil").await.unwrap();
    assert_eq!(reloaded.attr("nickname").unwrap().as_str(), Some("flip"));
    assert_eq!(reloaded.attr("fullname").unwrap().as_str(), Some("Phil B"));
    assert_eq!(reloaded.own_roles(), vec!["Editor", "Viewer"]);

    // column writes from an older view leave password and stamps alone
    ugm.users().passwd("phil", None, "secret").await.unwrap();
    assert!(ugm.users().authenticate("phil", "secret").await.unwrap());
    a.set_attr("login", "nickname").await.unwrap();
    b.remove_role("Editor").await.unwrap();

    let reloaded = ugm.users().get("phil").await.unwrap();
    assert!(reloaded.record().row.password.is_some());
    assert!(reloaded.record().row.last_login.is_some());
    assert_eq!(reloaded.own_roles(), vec!["Viewer"]);
    assert!(ugm.users().authenticate("phil", "secret").await.unwrap());
    assert_eq!(ugm.users().id_for_login("flip").await.unwrap(), "phil");
}

#[tokio::test]
async fn group_roles_follow_writes_from_other_views() {
    let ugm = build_ugm(UgmConfig::default()).await;
    seed(&ugm).await;

    let mut first = ugm.groups().get("staff").await.unwrap();
    let mut second = ugm.groups().get("staff").await.unwrap();
    first.add_role("Editor").await.unwrap();
    second.add_role("Reader").await.unwrap();

    assert_eq!(first.roles().await.unwrap(), vec!["Editor", "Reader"]);
    let donald = ugm.users().get("donald").await.unwrap();
    assert_eq!(donald.roles().await.unwrap(), vec!["Editor", "Reader"]);
}

#[tokio::test]
async fn malformed_stored_guid_is_an_internal_error() {
    let ugm = build_ugm(UgmConfig::default()).await;
    seed(&ugm).await;
    {
        let tx = ugm.session().runner().await.unwrap();
        tx.execute_unprepared(
            r#"INSERT INTO "principal" ("guid", "discriminator", "data", "principal_roles", "created")
               SELECT 'not-a-guid', "discriminator", "data", "principal_roles", "created"
               FROM "principal" WHERE "guid" = (SELECT "guid" FROM "user" WHERE "id" = 'phil')"#,
        )
        .await
        .unwrap();
        tx.execute_unprepared(
            r#"INSERT INTO "user" ("guid", "id") VALUES ('not-a-guid', 'mallory')"#,
        )
        .await
        .unwrap();
    }

    let err = ugm.users().get("mallory").await.unwrap_err();
    assert!(matches!(err, DomainError::Internal(_)), "{err:?}");
    assert!(ugm.users().get("phil").await.is_ok());
}

#[tokio::test]
async fn principal_refs_resolve_to_either_kind() {
    let ugm = build_ugm(UgmConfig::default()).await;
    seed(&ugm).await;

    let mut group = ugm.principal(&PrincipalRef::group("staff")).await.unwrap();
    assert_eq!(group.kind(), PrincipalKind::Group);
    ugm.add_role("Reader", &mut group).await.unwrap();

    let user = ugm.principal(&PrincipalRef::user("donald")).await.unwrap();
    assert_eq!(ugm.roles(&user).await.unwrap(), vec!["Reader"]);

    let err = ugm.principal(&PrincipalRef::user("staff")).await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn collections_keep_creation_order_and_reject_duplicates() {
    let ugm = build_ugm(UgmConfig::default()).await;
    seed(&ugm).await;

    assert_eq!(ugm.users().ids().await.unwrap(), vec!["phil", "donald"]);
    assert_eq!(ugm.groups().len().await.unwrap(), 2);

    let err = ugm
        .users()
        .create("phil", attrs([]))
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Conflict(_)));

    // a group may share an id with a user
    ugm.groups().create("phil", attrs([])).await.unwrap();
    assert_eq!(ugm.groups().len().await.unwrap(), 3);
}

#[tokio::test]
async fn attributes_read_and_write_through() {
    let ugm = build_ugm(UgmConfig::default()).await;
    seed(&ugm).await;

    let mut phil = ugm.users().get("phil").await.unwrap();
    assert_eq!(
        phil.attr_names(),
        vec![
            "id",
            "login",
            "first_login",
            "last_login",
            "created",
            "email",
            "fullname",
            "height"
        ]
    );
    assert_eq!(phil.attr("height").unwrap().as_i64(), Some(180));
    assert_eq!(phil.attr("missing").unwrap(), AttrValue::Null);
    assert_eq!(phil.attr("password").unwrap(), AttrValue::Null);
    assert!(phil.attr("created").unwrap().as_timestamp().is_some());

    phil.set_attr("fullname", "Phil Changed").await.unwrap();
    phil.set_attr("nickname", AttrValue::Null).await.unwrap();

    let reloaded = ugm.users().get("phil").await.unwrap();
    assert_eq!(reloaded.attr("fullname").unwrap().as_str(), Some("Phil Changed"));
    assert_eq!(reloaded.attr("nickname").unwrap().as_str(), Some(""));
    assert_eq!(
        reloaded.attrs().unwrap().get("email").and_then(AttrValue::as_str),
        Some("phil@example.com")
    );
}

#[tokio::test]
async fn protected_attributes_are_not_writable() {
    let ugm = build_ugm(UgmConfig::default()).await;
    seed(&ugm).await;
    let mut phil = ugm.users().get("phil").await.unwrap();

    for name in ["created", "password", "guid", "principal_roles"] {
        let err = phil.set_attr(name, "x").await.unwrap_err();
        assert!(matches!(err, DomainError::Unsupported(_)), "{name}");
    }

    let err = ugm
        .users()
        .create("eve", attrs([("guid", AttrValue::from("x"))]))
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Validation(_)));
}

#[tokio::test]
async fn configured_attribute_lists_limit_exposure() {
    let config = UgmConfig {
        user_attrs: vec!["email".to_owned(), "id".to_owned()],
        ..UgmConfig::default()
    };
    let ugm = build_ugm(config).await;
    seed(&ugm).await;

    let phil = ugm.users().get("phil").await.unwrap();
    let attrs = phil.attrs().unwrap();
    assert_eq!(attrs.len(), 2);
    assert_eq!(attrs.get("id").and_then(AttrValue::as_str), Some("phil"));
}

#[tokio::test]
async fn item_assignment_is_unsupported() {
    let ugm = build_ugm(UgmConfig::default()).await;
    seed(&ugm).await;
    let phil = ugm.users().get("phil").await.unwrap();
    let staff = ugm.groups().get("staff").await.unwrap();

    assert!(matches!(
        ugm.users().insert("phil", &phil),
        Err(DomainError::Unsupported(_))
    ));
    assert!(matches!(
        ugm.groups().insert("staff", &staff),
        Err(DomainError::Unsupported(_))
    ));
    assert!(matches!(
        staff.insert("phil", &phil),
        Err(DomainError::Unsupported(_))
    ));
    assert!(matches!(ugm.insert("users"), Err(DomainError::Unsupported(_))));
    assert!(matches!(ugm.remove("groups"), Err(DomainError::Unsupported(_))));
}

#[tokio::test]
async fn root_exposes_two_children() {
    let ugm = build_ugm(UgmConfig::default()).await;

    assert_eq!(ugm.keys(), ["users", "groups"]);
    assert!(matches!(ugm.get("users"), Ok(UgmChild::Users(_))));
    assert!(matches!(ugm.get("groups"), Ok(UgmChild::Groups(_))));
    assert!(ugm.get("roles").unwrap_err().is_not_found());

    ugm.invalidate(None).unwrap();
    ugm.invalidate(Some("users")).unwrap();
    assert!(ugm.invalidate(Some("roles")).unwrap_err().is_not_found());
}
