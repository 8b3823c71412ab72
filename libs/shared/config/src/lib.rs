use std::env;
use tracing::warn;

const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:3000";
const DEFAULT_ADMIN_PASSWORD: &str = "admin123";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_address: String,
    pub admin_password: String,
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub supabase_service_token: String,
    pub seed_sample_data: bool,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let config = Self {
            bind_address: env::var("BIND_ADDRESS")
                .unwrap_or_else(|_| DEFAULT_BIND_ADDRESS.to_string()),
            admin_password: env::var("ADMIN_PASSWORD")
                .unwrap_or_else(|_| {
                    warn!("ADMIN_PASSWORD not set, using the built-in default; change this in production");
                    DEFAULT_ADMIN_PASSWORD.to_string()
                }),
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
            supabase_service_token: env::var("SUPABASE_SERVICE_TOKEN")
                .unwrap_or_default(),
            seed_sample_data: env::var("SEED_SAMPLE_DATA")
                .map(|value| parse_flag(&value))
                .unwrap_or(true),
        };

        if !config.is_supabase_configured() {
            warn!("Supabase not configured - falling back to the in-process store");
        }

        config
    }

    /// Both the project URL and the anon key are needed to talk to PostgREST.
    pub fn is_supabase_configured(&self) -> bool {
        !self.supabase_url.is_empty() && !self.supabase_anon_key.is_empty()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_address: DEFAULT_BIND_ADDRESS.to_string(),
            admin_password: DEFAULT_ADMIN_PASSWORD.to_string(),
            supabase_url: String::new(),
            supabase_anon_key: String::new(),
            supabase_service_token: String::new(),
            seed_sample_data: true,
        }
    }
}

fn parse_flag(value: &str) -> bool {
    !matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "0" | "false" | "no" | "off"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flag_parsing() {
        assert!(parse_flag("true"));
        assert!(parse_flag("1"));
        assert!(!parse_flag("false"));
        assert!(!parse_flag(" OFF "));
    }

    #[test]
    fn test_default_config_uses_in_process_store() {
        let config = AppConfig::default();
        assert!(!config.is_supabase_configured());
        assert_eq!(config.bind_address, "0.0.0.0:3000");
    }
}
