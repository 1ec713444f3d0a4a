/// Shared test helpers: an app wired to an in-memory database, login
/// shortcuts, lookup builders and a multipart encoder for delivery writes.
use crate::config::test_helpers::{setup_test_app, setup_test_db};
use crate::routes::deliveries::db as deliveries;
use crate::routes::deliveries::delivery_services;
use crate::routes::deliveries::models::{DeliveryStatus, TechnicalState};
use crate::routes::lookups::{LookupKind, create_lookup};
use crate::routes::users::services::create_user;
use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, DatabaseConnection, Set};
use serde_json::{Value, json};
use std::str::FromStr;
use tempfile::TempDir;
use tower::ServiceExt;
use uuid::Uuid;

pub const TEST_PASSWORD: &str = "correct-horse-battery";

/// Extract response body as JSON for testing
pub async fn extract_response_body(response: axum::response::Response) -> (StatusCode, Value) {
    use axum::body::to_bytes;

    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Failed to read response body");
    let body: Value = serde_json::from_slice(&bytes)
        .unwrap_or_else(|_| json!({"error": "Invalid JSON response"}));
    (status, body)
}

/// Router, database and media directory of one test.
pub struct TestApp {
    pub app: Router,
    pub db: DatabaseConnection,
    pub media: TempDir,
}

impl TestApp {
    pub async fn new() -> Self {
        let db = setup_test_db().await;
        let media = tempfile::tempdir().expect("Failed to create media dir");
        let app = setup_test_app(&db, media.path()).await;
        Self { app, db, media }
    }

    pub async fn send(&self, request: Request<Body>) -> axum::response::Response {
        self.app.clone().oneshot(request).await.unwrap()
    }

    /// GET with the given `Cookie` header, returning status and JSON body.
    pub async fn get(&self, uri: &str, cookies: &str) -> (StatusCode, Value) {
        let response = self
            .send(
                Request::builder()
                    .uri(uri)
                    .header(header::COOKIE, cookies)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await;
        extract_response_body(response).await
    }

    /// Creates a user and logs in, returning a `Cookie` header value carrying
    /// both tokens, plus the user id.
    pub async fn login_as(&self, username: &str) -> (String, Uuid) {
        let user = create_user(&self.db, username, TEST_PASSWORD)
            .await
            .expect("Failed to create user");
        let response = self.send(login_request(username, TEST_PASSWORD)).await;
        assert_eq!(response.status(), StatusCode::OK, "login failed");

        let cookies = set_cookies(&response)
            .iter()
            .filter_map(|cookie| cookie.split(';').next().map(ToString::to_string))
            .collect::<Vec<_>>()
            .join("; ");
        (cookies, user.id)
    }

    pub async fn lookups(&self) -> Lookups {
        Lookups::create(&self.db).await
    }
}

pub fn login_request(username: &str, password: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/v1/token")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(
            json!({"username": username, "password": password}).to_string(),
        ))
        .unwrap()
}

/// Raw `Set-Cookie` headers of a response.
pub fn set_cookies(response: &axum::response::Response) -> Vec<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .map(ToString::to_string)
        .collect()
}

/// The `Set-Cookie` header for `name`, if the response sets it.
pub fn set_cookie_for(response: &axum::response::Response, name: &str) -> Option<String> {
    set_cookies(response)
        .into_iter()
        .find(|cookie| cookie.starts_with(&format!("{name}=")))
}

/// One row of every lookup table.
pub struct Lookups {
    pub transport: Uuid,
    pub other_transport: Uuid,
    pub packaging: Uuid,
    pub cargo: Uuid,
    pub service: Uuid,
    pub other_service: Uuid,
}

impl Lookups {
    pub async fn create(db: &DatabaseConnection) -> Self {
        Self {
            transport: create_lookup(db, LookupKind::Transport, "А123ВС").await.unwrap(),
            other_transport: create_lookup(db, LookupKind::Transport, "Х777ХХ")
                .await
                .unwrap(),
            packaging: create_lookup(db, LookupKind::Packaging, "Pallet").await.unwrap(),
            cargo: create_lookup(db, LookupKind::Cargo, "Furniture").await.unwrap(),
            service: create_lookup(db, LookupKind::Service, "Express").await.unwrap(),
            other_service: create_lookup(db, LookupKind::Service, "Insurance")
                .await
                .unwrap(),
        }
    }
}

/// A delivery row written straight to the database, for read-side tests.
pub struct DeliveryFixture {
    pub user_id: Uuid,
    pub transport: Uuid,
    pub packaging: Uuid,
    pub cargo: Option<Uuid>,
    pub services: Vec<Uuid>,
    pub departure: DateTime<Utc>,
    pub arrival: DateTime<Utc>,
    pub distance_km: &'static str,
    pub status: DeliveryStatus,
}

impl DeliveryFixture {
    pub fn new(user_id: Uuid, lookups: &Lookups) -> Self {
        let departure = utc("2024-05-01T10:00:00Z");
        Self {
            user_id,
            transport: lookups.transport,
            packaging: lookups.packaging,
            cargo: None,
            services: vec![lookups.service],
            departure,
            arrival: departure + chrono::Duration::hours(2),
            distance_km: "123.45",
            status: DeliveryStatus::Pending,
        }
    }

    pub async fn insert(self, db: &DatabaseConnection) -> Uuid {
        let id = Uuid::new_v4();
        deliveries::ActiveModel {
            id: Set(id),
            transport_model_id: Set(self.transport),
            departure_datetime: Set(self.departure),
            arrival_datetime: Set(self.arrival),
            distance_km: Set(Decimal::from_str(self.distance_km).unwrap()),
            media_file: Set(format!("deliveries/media/{id}.pdf")),
            status: Set(self.status),
            packaging_id: Set(self.packaging),
            cargo_type_id: Set(self.cargo),
            technical_state: Set(TechnicalState::Ok),
            user_id: Set(self.user_id),
        }
        .insert(db)
        .await
        .expect("Failed to insert delivery");

        for service in self.services {
            delivery_services::ActiveModel {
                delivery_id: Set(id),
                service_id: Set(service),
            }
            .insert(db)
            .await
            .expect("Failed to link service");
        }
        id
    }
}

pub fn utc(value: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(value)
        .expect("Invalid test datetime")
        .with_timezone(&Utc)
}

pub const BOUNDARY: &str = "delivery-test-boundary";

/// Encodes text fields and an optional `media_file` part as multipart/form-data.
pub fn multipart_body(fields: &[(&str, String)], file: Option<(&str, &[u8])>) -> Body {
    let mut body: Vec<u8> = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
    }
    if let Some((file_name, bytes)) = file {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"media_file\"; filename=\"{file_name}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    Body::from(body)
}

pub fn multipart_request(
    method: &str,
    uri: &str,
    cookies: &str,
    fields: &[(&str, String)],
    file: Option<(&str, &[u8])>,
) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::COOKIE, cookies)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(multipart_body(fields, file))
        .unwrap()
}

/// Every field a full create or replace needs, minus the file.
pub fn delivery_fields(lookups: &Lookups) -> Vec<(&'static str, String)> {
    vec![
        ("transport_model", lookups.transport.to_string()),
        ("departure_datetime", "2024-05-01T10:00:00Z".to_string()),
        ("arrival_datetime", "2024-05-01T12:30:00Z".to_string()),
        ("distance_km", "123.45".to_string()),
        ("packaging", lookups.packaging.to_string()),
        ("cargo_type", lookups.cargo.to_string()),
        ("services", lookups.service.to_string()),
        ("services", lookups.other_service.to_string()),
    ]
}
