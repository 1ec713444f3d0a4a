use crate::common::errors::BusinessError;
use crate::common::state::AppState;
use crate::config::CookieSettings;
use crate::routes::users::services::find_active;
use crate::unauthenticated;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const ACCESS_COOKIE: &str = "access_token";
pub const REFRESH_COOKIE: &str = "refresh_token";

pub const INVALID_TOKEN: &str = "Token is invalid or expired";
const NOT_PROVIDED: &str = "Authentication credentials were not provided.";
const WRONG_KIND: &str = "Given token not valid for any token type";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

/// Claims carried by both tokens of the pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User id
    pub sub: Uuid,
    pub token_type: TokenKind,
    pub jti: Uuid,
    pub iat: i64,
    pub nbf: i64,
    pub exp: i64,
}

/// HS256 signing keys and the lifetimes of the two token kinds.
#[derive(Clone)]
pub struct JwtKeys {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    access_lifetime: chrono::Duration,
    refresh_lifetime: chrono::Duration,
}

impl JwtKeys {
    pub fn new(
        secret: &str,
        access_lifetime: chrono::Duration,
        refresh_lifetime: chrono::Duration,
    ) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_nbf = true;
        validation.leeway = 0;

        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            access_lifetime,
            refresh_lifetime,
        }
    }

    pub fn lifetime(&self, kind: TokenKind) -> chrono::Duration {
        match kind {
            TokenKind::Access => self.access_lifetime,
            TokenKind::Refresh => self.refresh_lifetime,
        }
    }

    pub fn issue(&self, user_id: Uuid, kind: TokenKind) -> Result<String, BusinessError> {
        let now = chrono::Utc::now().timestamp();
        let claims = Claims {
            sub: user_id,
            token_type: kind,
            jti: Uuid::new_v4(),
            iat: now,
            nbf: now,
            exp: now + self.lifetime(kind).num_seconds(),
        };

        jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key).map_err(
            |e| BusinessError::InternalError {
                message: format!("jwt encode: {e}"),
            },
        )
    }

    /// Checks signature, expiry, not-before and the token kind.
    pub fn verify(&self, token: &str, expected: TokenKind) -> Result<Claims, BusinessError> {
        let claims = jsonwebtoken::decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| {
                tracing::warn!("Rejected token: {e}");
                unauthenticated!(INVALID_TOKEN)
            })?;

        if claims.token_type != expected {
            tracing::warn!(
                "Rejected {:?} token where {expected:?} was expected",
                claims.token_type
            );
            return Err(unauthenticated!(WRONG_KIND));
        }

        Ok(claims)
    }
}

/// Hash a plain password with argon2id.
pub fn hash_password(password: &str) -> Result<String, BusinessError> {
    use argon2::Argon2;
    use password_hash::{PasswordHasher, SaltString, rand_core::OsRng};

    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| BusinessError::InternalError {
            message: format!("password hash: {e}"),
        })
}

/// Verify a password against an argon2id PHC string.
pub fn verify_password(password: &str, hash: &str) -> bool {
    use argon2::Argon2;
    use password_hash::{PasswordHash, PasswordVerifier};

    PasswordHash::new(hash)
        .is_ok_and(|parsed| Argon2::default().verify_password(password.as_bytes(), &parsed).is_ok())
}

/// The authenticated caller, inserted as a request extension by [`require_auth`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentUser {
    pub id: Uuid,
    pub username: String,
}

/// Authenticates the request from its access-token cookie.
pub async fn require_auth(
    State(state): State<AppState>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Result<Response, BusinessError> {
    let token = jar
        .get(ACCESS_COOKIE)
        .map(|cookie| cookie.value().to_owned())
        .filter(|value| !value.is_empty())
        .ok_or_else(|| unauthenticated!(NOT_PROVIDED))?;

    let claims = state.jwt.verify(&token, TokenKind::Access)?;
    let user = find_active(&state.db, claims.sub)
        .await?
        .ok_or_else(|| unauthenticated!("User not found or inactive"))?;

    request.extensions_mut().insert(CurrentUser {
        id: user.id,
        username: user.username,
    });

    Ok(next.run(request).await)
}

/// An HTTP-only auth cookie living as long as its token.
pub fn auth_cookie(
    name: &'static str,
    token: String,
    lifetime: chrono::Duration,
    settings: CookieSettings,
) -> Cookie<'static> {
    Cookie::build((name, token))
        .path("/")
        .http_only(true)
        .secure(settings.secure)
        .same_site(settings.same_site)
        .max_age(time::Duration::seconds(lifetime.num_seconds()))
        .build()
}

/// Expired, empty cookie with the same flags, so browsers drop the original.
pub fn removal_cookie(name: &'static str, settings: CookieSettings) -> Cookie<'static> {
    let mut cookie = Cookie::build((name, ""))
        .path("/")
        .http_only(true)
        .secure(settings.secure)
        .same_site(settings.same_site)
        .build();
    cookie.make_removal();
    cookie
}
