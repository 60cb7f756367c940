use std::env;
use std::sync::OnceLock;

#[derive(Clone)]
pub struct Config {
    pub port: u16,
    pub database_url: String,
    /// Allowed origin for mutating requests. None disables the check outside
    /// production.
    pub app_url: Option<String>,
    pub environment: String,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            port: env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(3000),
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite:./data/draftdesk.db?mode=rwc".to_string()),
            app_url: env::var("APP_URL").ok().filter(|v| !v.is_empty()),
            environment: env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        }
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

static PRODUCTION: OnceLock<bool> = OnceLock::new();

/// Snapshots the environment for code that runs outside a request's state,
/// such as error response shaping. Recorded when the router is built, so the
/// flag always agrees with the `Config` the handlers see.
pub fn record_environment(config: &Config) {
    let _ = PRODUCTION.set(config.is_production());
}

pub fn in_production() -> bool {
    PRODUCTION.get().copied().unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recorded_environment_drives_the_production_flag() {
        let config = Config {
            port: 0,
            database_url: String::new(),
            app_url: None,
            environment: "development".to_string(),
        };
        record_environment(&config);
        assert!(!in_production());
    }
}
