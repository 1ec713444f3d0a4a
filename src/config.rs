use axum_extra::extract::cookie::SameSite;
use dotenvy::dotenv;
use std::env;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct Config {
    pub db_url: Option<String>,
    pub app_name: String,
    pub deployment: String,
    pub listen_addr: String,
    pub jwt_secret: String,
    pub access_token_lifetime: chrono::Duration,
    pub refresh_token_lifetime: chrono::Duration,
    pub cookies: CookieSettings,
    pub media_root: PathBuf,
    pub media_url: String,
}

/// Flags applied to every auth cookie the API sets or clears.
#[derive(Debug, Clone, Copy)]
pub struct CookieSettings {
    pub secure: bool,
    pub same_site: SameSite,
}

impl Default for CookieSettings {
    fn default() -> Self {
        Self {
            secure: true,
            same_site: SameSite::None,
        }
    }
}

fn parse_same_site(value: &str) -> SameSite {
    match value.to_ascii_lowercase().as_str() {
        "lax" => SameSite::Lax,
        "strict" => SameSite::Strict,
        _ => SameSite::None,
    }
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(default)
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok(); // Load from .env file if available
        let db_url = env::var("DB_URL").ok().or_else(|| {
            Some(format!(
                "{}://{}:{}@{}:{}/{}",
                env::var("DB_PREFIX").unwrap_or_else(|_| "postgresql".to_string()),
                env::var("DB_USER").expect("DB_USER must be set"),
                env::var("DB_PASSWORD").expect("DB_PASSWORD must be set"),
                env::var("DB_HOST").expect("DB_HOST must be set"),
                env::var("DB_PORT").unwrap_or_else(|_| "5432".to_string()),
                env::var("DB_NAME").expect("DB_NAME must be set"),
            ))
        });

        Config {
            app_name: env::var("APP_NAME").unwrap_or_else(|_| "delivery-api".to_string()),
            deployment: env::var("DEPLOYMENT")
                .expect("DEPLOYMENT must be set, this can be local, dev, stage, or prod"),
            listen_addr: env::var("LISTEN_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string()),
            jwt_secret: env::var("JWT_SECRET").expect("JWT_SECRET must be set"),
            access_token_lifetime: chrono::Duration::minutes(env_or(
                "ACCESS_TOKEN_LIFETIME_MINUTES",
                5,
            )),
            refresh_token_lifetime: chrono::Duration::days(env_or(
                "REFRESH_TOKEN_LIFETIME_DAYS",
                1,
            )),
            cookies: CookieSettings {
                secure: env_or("COOKIE_SECURE", true),
                same_site: env::var("COOKIE_SAMESITE")
                    .map(|value| parse_same_site(&value))
                    .unwrap_or(SameSite::None),
            },
            media_root: env::var("MEDIA_ROOT")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("./media")),
            media_url: env::var("MEDIA_URL").unwrap_or_else(|_| "/media/".to_string()),
            db_url,
        }
    }

    #[cfg(test)]
    pub fn for_tests() -> Self {
        Config {
            app_name: "delivery-api-test".to_string(),
            deployment: "test".to_string(),
            listen_addr: "127.0.0.1:0".to_string(),
            jwt_secret: "test-jwt-secret".to_string(),
            access_token_lifetime: chrono::Duration::minutes(5),
            refresh_token_lifetime: chrono::Duration::days(1),
            cookies: CookieSettings::default(),
            media_root: std::env::temp_dir().join("delivery-api-test-media"),
            media_url: "/media/".to_string(),
            db_url: Some("sqlite::memory:".to_string()),
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_site_parsing_defaults_to_none() {
        assert_eq!(parse_same_site("lax"), SameSite::Lax);
        assert_eq!(parse_same_site("STRICT"), SameSite::Strict);
        assert_eq!(parse_same_site("none"), SameSite::None);
        assert_eq!(parse_same_site("bogus"), SameSite::None);
    }

    #[test]
    fn test_config_uses_short_lived_access_tokens() {
        let config = Config::for_tests();
        assert!(config.access_token_lifetime < config.refresh_token_lifetime);
        assert!(config.cookies.secure);
        assert_eq!(config.cookies.same_site, SameSite::None);
    }
}
