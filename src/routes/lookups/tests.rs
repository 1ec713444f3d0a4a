use super::{LookupKind, create_lookup, delete_lookup};
use crate::common::errors::BusinessError;
use crate::test_helpers::{DeliveryFixture, TestApp};
use axum::http::StatusCode;

#[tokio::test]
async fn test_lookup_listings_require_auth() {
    let t = TestApp::new().await;
    for uri in [
        "/api/v1/transports",
        "/api/v1/packaging",
        "/api/v1/cargo",
        "/api/v1/services",
    ] {
        let (status, _) = t.get(uri, "").await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{uri}");
    }
}

#[tokio::test]
async fn test_lookup_listings_serialize_identifying_field() {
    let t = TestApp::new().await;
    let (cookies, _) = t.login_as("courier").await;
    let lookups = t.lookups().await;

    let (status, body) = t.get("/api/v1/transports", &cookies).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 2);
    assert!(body["next"].is_null());
    assert!(body["previous"].is_null());
    let plates: Vec<&str> = body["results"]
        .as_array()
        .unwrap()
        .iter()
        .map(|item| item["plate_number"].as_str().unwrap())
        .collect();
    assert_eq!(plates.len(), 2);
    assert!(plates.contains(&"А123ВС"));

    let (status, body) = t
        .get(&format!("/api/v1/packaging/{}", lookups.packaging), &cookies)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], lookups.packaging.to_string());
    assert_eq!(body["title"], "Pallet");

    let (status, body) = t
        .get(&format!("/api/v1/cargo/{}", lookups.cargo), &cookies)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "Furniture");

    let (status, body) = t.get("/api/v1/services", &cookies).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 2);
    assert_eq!(body["results"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_lookup_listing_is_paginated() {
    let t = TestApp::new().await;
    let (cookies, _) = t.login_as("courier").await;
    t.lookups().await;

    let (status, body) = t.get("/api/v1/services?page_size=1", &cookies).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 2);
    assert_eq!(body["next"], 2);
    assert!(body["previous"].is_null());
    assert_eq!(body["results"].as_array().unwrap().len(), 1);
    let first = body["results"][0]["name"].clone();

    let (status, body) = t
        .get("/api/v1/services?page=2&page_size=1", &cookies)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["next"].is_null());
    assert_eq!(body["previous"], 1);
    assert_ne!(body["results"][0]["name"], first);

    let (status, body) = t.get("/api/v1/services?page=3&page_size=1", &cookies).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["message"], "Invalid page.");

    let (status, body) = t.get("/api/v1/cargo?page=1&page_size=500", &cookies).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 1);
    assert!(body["next"].is_null());
}

#[tokio::test]
async fn test_transport_plate_is_validated_and_unique() {
    let t = TestApp::new().await;

    let err = create_lookup(&t.db, LookupKind::Transport, "A123BC")
        .await
        .unwrap_err();
    assert!(matches!(err, BusinessError::ValidationError { .. }));

    create_lookup(&t.db, LookupKind::Transport, "М001ММ")
        .await
        .unwrap();
    let err = create_lookup(&t.db, LookupKind::Transport, "М001ММ")
        .await
        .unwrap_err();
    assert!(matches!(err, BusinessError::Duplicate { .. }));

    let err = create_lookup(&t.db, LookupKind::Service, "  ")
        .await
        .unwrap_err();
    assert!(matches!(err, BusinessError::ValidationError { .. }));
}

#[tokio::test]
async fn test_referenced_lookups_are_protected() {
    let t = TestApp::new().await;
    let (_, user_id) = t.login_as("courier").await;
    let lookups = t.lookups().await;
    DeliveryFixture {
        cargo: Some(lookups.cargo),
        ..DeliveryFixture::new(user_id, &lookups)
    }
    .insert(&t.db)
    .await;

    for (kind, id) in [
        (LookupKind::Transport, lookups.transport),
        (LookupKind::Packaging, lookups.packaging),
        (LookupKind::Cargo, lookups.cargo),
        (LookupKind::Service, lookups.service),
    ] {
        let err = delete_lookup(&t.db, kind, id).await.unwrap_err();
        assert!(
            matches!(err, BusinessError::BusinessRuleViolation { .. }),
            "{kind} should be protected"
        );
    }

    // Unreferenced rows can go
    delete_lookup(&t.db, LookupKind::Transport, lookups.other_transport)
        .await
        .unwrap();
    delete_lookup(&t.db, LookupKind::Service, lookups.other_service)
        .await
        .unwrap();

    let err = delete_lookup(&t.db, LookupKind::Service, lookups.other_service)
        .await
        .unwrap_err();
    assert!(matches!(err, BusinessError::NotFound { .. }));
}
