#![allow(clippy::unwrap_used, clippy::expect_used)]

use sql_ugm_sdk::{AttrValue, Criteria, SearchRequest, SearchResult};
use tracing_test::traced_test;

use super::error::DomainError;
use crate::config::UgmConfig;
use crate::test_support::{attrs, build_ugm, seed};

fn ids(result: &SearchResult) -> Vec<&str> {
    result.ids()
}

#[tokio::test]
async fn wildcard_matches_are_ordered_by_id() {
    let ugm = build_ugm(UgmConfig::default()).await;
    seed(&ugm).await;

    let request = SearchRequest::new(Criteria::new().with("email", "*@example.com"));
    let result = ugm.users().search(&request).await.unwrap();
    assert_eq!(result, SearchResult::Ids(vec!["donald".into(), "phil".into()]));
}

#[tokio::test]
async fn exact_match_on_integer_attribute() {
    let ugm = build_ugm(UgmConfig::default()).await;
    seed(&ugm).await;

    let request = SearchRequest::new(Criteria::new().with("height", 180)).exact();
    let result = ugm.users().search(&request).await.unwrap();
    assert_eq!(ids(&result), vec!["phil"]);

    // integers compare by equality even without exact_match
    let request = SearchRequest::new(Criteria::new().with("height", 175));
    let result = ugm.users().search(&request).await.unwrap();
    assert_eq!(ids(&result), vec!["donald"]);
}

#[tokio::test]
async fn text_and_integer_criteria_do_not_cross_types() {
    let ugm = build_ugm(UgmConfig::default()).await;
    seed(&ugm).await;
    ugm.users()
        .create("walter", attrs([("height", AttrValue::from("175"))]))
        .await
        .unwrap();

    // phil stores the number 180, not the text
    let request = SearchRequest::new(Criteria::new().with("height", "180")).exact();
    let err = ugm.users().search(&request).await.unwrap_err();
    assert!(matches!(err, DomainError::Validation(_)));

    let request = SearchRequest::new(Criteria::new().with("height", 175));
    let result = ugm.users().search(&request).await.unwrap();
    assert_eq!(ids(&result), vec!["donald"]);

    let request = SearchRequest::new(Criteria::new().with("height", "175")).exact();
    let result = ugm.users().search(&request).await.unwrap();
    assert_eq!(ids(&result), vec!["walter"]);
}

#[tokio::test]
async fn exact_match_without_rows_is_a_validation_error() {
    let ugm = build_ugm(UgmConfig::default()).await;
    seed(&ugm).await;

    let request = SearchRequest::new(Criteria::new().with("email", "nobody@example.com")).exact();
    let err = ugm.users().search(&request).await.unwrap_err();
    assert!(matches!(err, DomainError::Validation(_)));

    // the same value as a wildcard search is just empty
    let request = SearchRequest::new(Criteria::new().with("email", "nobody@example.com"));
    assert!(ugm.users().search(&request).await.unwrap().is_empty());
}

#[tokio::test]
async fn exact_match_does_not_expand_wildcards() {
    let ugm = build_ugm(UgmConfig::default()).await;
    seed(&ugm).await;

    let request = SearchRequest::new(Criteria::new().with("email", "*@example.com")).exact();
    assert!(ugm.users().search(&request).await.is_err());
}

#[tokio::test]
async fn criteria_combine_with_and_or_or() {
    let ugm = build_ugm(UgmConfig::default()).await;
    seed(&ugm).await;
    let criteria = Criteria::new()
        .with("id", "phil")
        .with("fullname", "Donald*");

    let and = SearchRequest::new(criteria.clone());
    assert!(ugm.users().search(&and).await.unwrap().is_empty());

    let or = SearchRequest::new(criteria).or();
    let result = ugm.users().search(&or).await.unwrap();
    assert_eq!(ids(&result), vec!["donald", "phil"]);
}

#[tokio::test]
async fn empty_criteria_match_everything() {
    let ugm = build_ugm(UgmConfig::default()).await;
    seed(&ugm).await;

    let result = ugm.users().search(&SearchRequest::default()).await.unwrap();
    assert_eq!(ids(&result), vec!["donald", "phil"]);

    let result = ugm.groups().search(&SearchRequest::default()).await.unwrap();
    assert_eq!(ids(&result), vec!["admins", "staff"]);
}

#[tokio::test]
async fn fixed_fields_compare_against_columns() {
    let ugm = build_ugm(UgmConfig::default()).await;
    seed(&ugm).await;

    let request = SearchRequest::new(Criteria::new().with("id", "ph*"));
    let result = ugm.users().search(&request).await.unwrap();
    assert_eq!(ids(&result), vec!["phil"]);

    let request = SearchRequest::new(Criteria::new().with("login", "email")).exact();
    let result = ugm.users().search(&request).await.unwrap();
    assert_eq!(ids(&result), vec!["donald", "phil"]);

    // groups have no login column, so it is read from data
    let request = SearchRequest::new(Criteria::new().with("login", "email"));
    assert!(ugm.groups().search(&request).await.unwrap().is_empty());
}

#[tokio::test]
async fn all_attributes_include_fixed_fields_and_data_keys() {
    let ugm = build_ugm(UgmConfig::default()).await;
    seed(&ugm).await;

    let request = SearchRequest::new(Criteria::new().with("id", "phil"))
        .exact()
        .all_attrs();
    let SearchResult::WithAttrs(rows) = ugm.users().search(&request).await.unwrap() else {
        panic!("expected attributes");
    };
    assert_eq!(rows.len(), 1);
    let (id, found) = &rows[0];
    assert_eq!(id, "phil");
    assert_eq!(
        found.keys().map(String::as_str).collect::<Vec<_>>(),
        vec!["email", "fullname", "height", "login"]
    );
    assert_eq!(found["login"].as_str(), Some("email"));
    assert_eq!(found["height"].as_i64(), Some(180));

    let request = SearchRequest::new(Criteria::new().with("title", "Admin*")).all_attrs();
    let SearchResult::WithAttrs(rows) = ugm.groups().search(&request).await.unwrap() else {
        panic!("expected attributes");
    };
    assert_eq!(rows[0].0, "admins");
    assert_eq!(rows[0].1.keys().collect::<Vec<_>>(), vec!["title"]);
}

#[tokio::test]
async fn selected_attributes_fill_missing_with_null() {
    let ugm = build_ugm(UgmConfig::default()).await;
    seed(&ugm).await;

    let request = SearchRequest::new(Criteria::new().with("id", "donald"))
        .attrs(["email", "shoe_size"]);
    let SearchResult::WithAttrs(rows) = ugm.users().search(&request).await.unwrap() else {
        panic!("expected attributes");
    };
    let found = &rows[0].1;
    assert_eq!(found["email"].as_str(), Some("donald@example.com"));
    assert_eq!(found["shoe_size"], AttrValue::Null);
}

#[tokio::test]
async fn binary_attributes_round_trip() {
    let config = UgmConfig {
        binary_attrs: vec!["portrait".to_owned()],
        ..UgmConfig::default()
    };
    let ugm = build_ugm(config).await;
    let user = ugm
        .users()
        .create(
            "vera",
            attrs([
                ("portrait", AttrValue::from(vec![0x89_u8, 0x50, 0x4e, 0x47])),
                ("avatar", AttrValue::from(Vec::<u8>::new())),
            ]),
        )
        .await
        .err();
    // empty bytes on a non-binary attribute have no JSON form
    assert!(matches!(user, Some(DomainError::Validation(_))));

    let mut vera = ugm
        .users()
        .create(
            "vera",
            attrs([("portrait", AttrValue::from(vec![0x89_u8, 0x50, 0x4e, 0x47]))]),
        )
        .await
        .unwrap();
    assert_eq!(
        vera.record().data().get("portrait"),
        Some(&serde_json::json!("iVBORw=="))
    );
    assert_eq!(
        vera.attr("portrait").unwrap().as_bytes(),
        Some(&[0x89_u8, 0x50, 0x4e, 0x47][..])
    );

    let request = SearchRequest::new(Criteria::new().with("id", "vera")).attrs(["portrait"]);
    let SearchResult::WithAttrs(rows) = ugm.users().search(&request).await.unwrap() else {
        panic!("expected attributes");
    };
    assert_eq!(rows[0].1["portrait"], AttrValue::Binary(vec![0x89, 0x50, 0x4e, 0x47]));

    vera.set_attr("portrait", Vec::<u8>::new()).await.unwrap();
    assert_eq!(vera.attr("portrait").unwrap().as_str(), Some(""));
}

#[tokio::test]
async fn id_for_login_resolves_through_the_login_attribute() {
    let ugm = build_ugm(UgmConfig::default()).await;
    seed(&ugm).await;

    let users = ugm.users();
    assert_eq!(users.id_for_login("donald@example.com").await.unwrap(), "donald");
    // no match falls back to the value itself
    assert_eq!(users.id_for_login("phil").await.unwrap(), "phil");
    assert_eq!(users.id_for_login("someone").await.unwrap(), "someone");
}

#[tokio::test]
#[traced_test]
async fn ambiguous_login_picks_the_lowest_id() {
    let ugm = build_ugm(UgmConfig::default()).await;
    seed(&ugm).await;
    ugm.users()
        .create(
            "zed",
            attrs([
                ("login", AttrValue::from("email")),
                ("email", AttrValue::from("phil@example.com")),
            ]),
        )
        .await
        .unwrap();
    ugm.users()
        .create(
            "anna",
            attrs([
                ("login", AttrValue::from("alias")),
                ("alias", AttrValue::from("phil@example.com")),
            ]),
        )
        .await
        .unwrap();

    let id = ugm.users().id_for_login("phil@example.com").await.unwrap();
    assert_eq!(id, "anna");
    assert!(logs_contain("ambiguous login"));
}
