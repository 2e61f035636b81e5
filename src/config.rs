use std::{env, str::FromStr, time::Duration};

use anyhow::bail;

/// How read-check-write sequences on stock and slots are executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConsistencyMode {
    /// Plain reads followed by plain writes; concurrent requests can oversell or double-book.
    #[default]
    BestEffort,
    /// Conditional store primitives close both races.
    Strict,
}

impl FromStr for ConsistencyMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "best_effort" | "best-effort" | "" => Ok(ConsistencyMode::BestEffort),
            "strict" => Ok(ConsistencyMode::Strict),
            other => bail!("unknown CONSISTENCY_MODE {other:?}"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct EmailApiConfig {
    pub url: String,
    pub api_key: String,
    pub from: String,
}

#[derive(Debug, Clone)]
pub struct WhatsAppApiConfig {
    pub url: String,
    pub account_sid: String,
    pub auth_token: String,
    pub from: String,
}

#[derive(Debug, Clone)]
pub struct NotifyConfig {
    pub email: Option<EmailApiConfig>,
    pub whatsapp: Option<WhatsAppApiConfig>,
    pub max_attempts: u32,
    pub backoff: Duration,
    pub queue_capacity: usize,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub production: bool,
    pub database_url: Option<String>,
    pub jwt_secret: String,
    pub razorpay_key_id: String,
    pub razorpay_key_secret: String,
    pub razorpay_api_url: String,
    pub consistency: ConsistencyMode,
    pub frontend_url: String,
    pub request_timeout: Duration,
    pub upstream_timeout: Duration,
    pub notify: NotifyConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = parse_or("APP_PORT", 3000);
        let production = env::var("APP_ENV").is_ok_and(|v| v.eq_ignore_ascii_case("production"));
        let database_url = optional("DATABASE_URL");
        let jwt_secret = env::var("JWT_SECRET")?;
        let razorpay_key_id = env::var("RAZORPAY_KEY_ID").unwrap_or_default();
        let razorpay_key_secret = env::var("RAZORPAY_KEY_SECRET")?;
        let razorpay_api_url = env::var("RAZORPAY_API_URL")
            .unwrap_or_else(|_| "https://api.razorpay.com/v1".to_string());
        let consistency = env::var("CONSISTENCY_MODE")
            .unwrap_or_default()
            .parse::<ConsistencyMode>()?;
        let frontend_url =
            env::var("FRONTEND_URL").unwrap_or_else(|_| "http://localhost:3000".to_string());

        let email = match (optional("EMAIL_API_URL"), optional("EMAIL_API_KEY")) {
            (Some(url), Some(api_key)) => Some(EmailApiConfig {
                url,
                api_key,
                from: env::var("EMAIL_FROM").unwrap_or_else(|_| "no-reply@petcare.local".into()),
            }),
            _ => None,
        };
        let whatsapp = match (
            optional("WHATSAPP_ACCOUNT_SID"),
            optional("WHATSAPP_AUTH_TOKEN"),
            optional("WHATSAPP_FROM"),
        ) {
            (Some(account_sid), Some(auth_token), Some(from)) => Some(WhatsAppApiConfig {
                url: env::var("WHATSAPP_API_URL")
                    .unwrap_or_else(|_| "https://api.twilio.com".into()),
                account_sid,
                auth_token,
                from,
            }),
            _ => None,
        };

        Ok(Self {
            host,
            port,
            production,
            database_url,
            jwt_secret,
            razorpay_key_id,
            razorpay_key_secret,
            razorpay_api_url,
            consistency,
            frontend_url,
            request_timeout: Duration::from_secs(parse_or("REQUEST_TIMEOUT_SECS", 30)),
            upstream_timeout: Duration::from_secs(parse_or("UPSTREAM_TIMEOUT_SECS", 10)),
            notify: NotifyConfig {
                email,
                whatsapp,
                max_attempts: parse_or("NOTIFY_MAX_ATTEMPTS", 5),
                backoff: Duration::from_millis(parse_or("NOTIFY_BACKOFF_MS", 500)),
                queue_capacity: parse_or("NOTIFY_QUEUE_CAPACITY", 1024),
            },
        })
    }
}

fn optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn consistency_mode_parses_known_values() {
        assert_eq!("strict".parse::<ConsistencyMode>().unwrap(), ConsistencyMode::Strict);
        assert_eq!(
            "best_effort".parse::<ConsistencyMode>().unwrap(),
            ConsistencyMode::BestEffort
        );
        assert_eq!("".parse::<ConsistencyMode>().unwrap(), ConsistencyMode::BestEffort);
        assert!("eventual".parse::<ConsistencyMode>().is_err());
    }
}
