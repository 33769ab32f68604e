use std::env;
use std::str::FromStr;
use tracing::warn;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub supabase_service_role_key: Option<String>,
    pub supabase_jwt_secret: String,
    pub port: u16,
    pub slot_lookahead_days: u32,
    pub max_slot_lookahead_days: u32,
    pub cancellation_notice_hours: i64,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let config = Self {
            supabase_url: env::var("SUPABASE_URL")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_URL not set, using empty value");
                    String::new()
                }),
            supabase_anon_key: env::var("SUPABASE_ANON_PUBLIC_KEY")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_ANON_PUBLIC_KEY not set, using empty value");
                    String::new()
                }),
            supabase_service_role_key: env::var("SUPABASE_SERVICE_ROLE_KEY").ok(),
            supabase_jwt_secret: env::var("SUPABASE_JWT_SECRET")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_JWT_SECRET not set, using empty value");
                    String::new()
                }),
            port: parse_var("PORT", 3000),
            slot_lookahead_days: parse_var("SLOT_LOOKAHEAD_DAYS", 7),
            max_slot_lookahead_days: parse_var("MAX_SLOT_LOOKAHEAD_DAYS", 90),
            cancellation_notice_hours: parse_var("CANCELLATION_NOTICE_HOURS", 24),
        };

        if !config.is_configured() {
            warn!("Supabase not configured - falling back to the in-memory store");
        }

        if config.max_slot_lookahead_days < config.slot_lookahead_days {
            warn!(
                "MAX_SLOT_LOOKAHEAD_DAYS ({}) is below SLOT_LOOKAHEAD_DAYS ({})",
                config.max_slot_lookahead_days, config.slot_lookahead_days
            );
        }

        config
    }

    pub fn is_configured(&self) -> bool {
        !self.supabase_url.is_empty()
            && !self.supabase_anon_key.is_empty()
            && !self.supabase_jwt_secret.is_empty()
    }

    /// Key sent as the bearer token to PostgREST. The service role key bypasses
    /// row level security, which the store adapters rely on.
    pub fn supabase_api_key(&self) -> &str {
        self.supabase_service_role_key
            .as_deref()
            .unwrap_or(&self.supabase_anon_key)
    }
}

fn parse_var<T>(name: &str, default: T) -> T
where
    T: FromStr + std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) => raw.parse().unwrap_or_else(|_| {
            warn!("{} has invalid value {:?}, using default {}", name, raw, default);
            default
        }),
        Err(_) => default,
    }
}
