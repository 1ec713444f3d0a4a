use crate::common::auth::{JwtKeys, TokenKind};
use crate::config::Config;
use crate::routes::users::services::create_user;
use crate::test_helpers::{
    TEST_PASSWORD, TestApp, extract_response_body, login_request, set_cookie_for, set_cookies,
};
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use serde_json::json;
use uuid::Uuid;

fn post(uri: &str, cookies: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("POST").uri(uri);
    if let Some(cookies) = cookies {
        builder = builder.header(header::COOKIE, cookies);
    }
    builder.body(Body::empty()).unwrap()
}

#[tokio::test]
async fn test_login_sets_both_cookies() {
    let t = TestApp::new().await;
    create_user(&t.db, "courier", TEST_PASSWORD).await.unwrap();

    let response = t.send(login_request("courier", TEST_PASSWORD)).await;
    let access = set_cookie_for(&response, "access_token").expect("access cookie");
    let refresh = set_cookie_for(&response, "refresh_token").expect("refresh cookie");

    for cookie in [&access, &refresh] {
        assert!(cookie.contains("HttpOnly"), "{cookie}");
        assert!(cookie.contains("Secure"), "{cookie}");
        assert!(cookie.contains("SameSite=None"), "{cookie}");
    }
    assert!(access.contains("Max-Age=300"), "{access}");
    assert!(refresh.contains("Max-Age=86400"), "{refresh}");

    let (status, body) = extract_response_body(response).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"status": "success", "detail": "Login successful"}));
}

#[tokio::test]
async fn test_login_with_bad_credentials() {
    let t = TestApp::new().await;
    create_user(&t.db, "courier", TEST_PASSWORD).await.unwrap();

    let response = t.send(login_request("courier", "wrong-password")).await;
    assert!(set_cookies(&response).is_empty());
    let (status, body) = extract_response_body(response).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(
        body["error"]["message"],
        "No active account found with the given credentials"
    );

    let response = t.send(login_request("nobody", TEST_PASSWORD)).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_login_missing_fields() {
    let t = TestApp::new().await;
    let response = t
        .send(
            Request::builder()
                .method("POST")
                .uri("/api/v1/token")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json!({"username": "courier"}).to_string()))
                .unwrap(),
        )
        .await;

    let (status, body) = extract_response_body(response).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["fields"]["password"][0], "This field is required.");
}

#[tokio::test]
async fn test_refresh_replaces_only_access_cookie() {
    let t = TestApp::new().await;
    let (cookies, _) = t.login_as("courier").await;

    let response = t.send(post("/api/v1/token/refresh", Some(&cookies))).await;
    assert!(set_cookie_for(&response, "access_token").is_some());
    assert!(set_cookie_for(&response, "refresh_token").is_none());

    let (status, body) = extract_response_body(response).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"detail": "Token refreshed"}));
}

#[tokio::test]
async fn test_refresh_without_cookie() {
    let t = TestApp::new().await;

    let response = t.send(post("/api/v1/token/refresh", None)).await;
    assert!(set_cookie_for(&response, "access_token").is_none());
    let (status, body) = extract_response_body(response).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["fields"]["refresh"][0], "This field may not be null.");
}

#[tokio::test]
async fn test_refresh_with_invalid_tokens() {
    let t = TestApp::new().await;
    let (cookies, user_id) = t.login_as("courier").await;

    // Garbage token
    let response = t
        .send(post("/api/v1/token/refresh", Some("refresh_token=garbage")))
        .await;
    assert!(set_cookie_for(&response, "access_token").is_none());
    let (status, body) = extract_response_body(response).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["message"], "Token is invalid or expired");

    // An access token is not accepted where a refresh token is expected
    let access = cookies
        .split("; ")
        .find_map(|pair| pair.strip_prefix("access_token="))
        .unwrap();
    let response = t
        .send(post(
            "/api/v1/token/refresh",
            Some(&format!("refresh_token={access}")),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // Expired refresh token signed with the right key
    let config = Config::for_tests();
    let expired = JwtKeys::new(
        &config.jwt_secret,
        config.access_token_lifetime,
        chrono::Duration::seconds(-30),
    )
    .issue(user_id, TokenKind::Refresh)
    .unwrap();
    let response = t
        .send(post(
            "/api/v1/token/refresh",
            Some(&format!("refresh_token={expired}")),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_logout_clears_cookies_without_auth() {
    let t = TestApp::new().await;

    for cookies in [None, Some("access_token=garbage; refresh_token=garbage")] {
        let response = t.send(post("/api/v1/logout", cookies)).await;
        for name in ["access_token", "refresh_token"] {
            let cookie = set_cookie_for(&response, name).expect("removal cookie");
            assert!(cookie.starts_with(&format!("{name}=;")), "{cookie}");
            assert!(cookie.contains("Max-Age=0"), "{cookie}");
            assert!(cookie.contains("SameSite=None"), "{cookie}");
        }

        let (status, body) = extract_response_body(response).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"detail": "Logged out"}));
    }
}

#[tokio::test]
async fn test_protected_routes_require_access_cookie() {
    let t = TestApp::new().await;
    let (cookies, _) = t.login_as("courier").await;

    let (status, _) = t.get("/api/v1/deliveries", &cookies).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = t.get("/api/v1/deliveries", "").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "NOT_AUTHENTICATED");

    let (status, _) = t.get("/api/v1/cargo", "access_token=garbage").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // Refresh tokens cannot authenticate requests
    let refresh = cookies
        .split("; ")
        .find_map(|pair| pair.strip_prefix("refresh_token="))
        .unwrap();
    let (status, _) = t
        .get("/api/v1/services", &format!("access_token={refresh}"))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_token_for_unknown_user_is_rejected() {
    let t = TestApp::new().await;
    let config = Config::for_tests();
    let token = JwtKeys::new(
        &config.jwt_secret,
        config.access_token_lifetime,
        config.refresh_token_lifetime,
    )
    .issue(Uuid::new_v4(), TokenKind::Access)
    .unwrap();

    let (status, _) = t
        .get("/api/v1/deliveries", &format!("access_token={token}"))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_auth_routes_accept_trailing_slash() {
    let t = TestApp::new().await;
    create_user(&t.db, "courier", TEST_PASSWORD).await.unwrap();

    let response = t
        .send(
            Request::builder()
                .method("POST")
                .uri("/api/v1/token/")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(
                    json!({"username": "courier", "password": TEST_PASSWORD}).to_string(),
                ))
                .unwrap(),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let refresh = set_cookie_for(&response, "refresh_token").expect("refresh cookie");
    let refresh = refresh.split(';').next().unwrap().to_string();

    let response = t.send(post("/api/v1/token/refresh/", Some(&refresh))).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(set_cookie_for(&response, "access_token").is_some());

    let response = t.send(post("/api/v1/logout/", None)).await;
    assert_eq!(response.status(), StatusCode::OK);
}
