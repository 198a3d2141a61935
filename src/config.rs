use std::env;

pub struct Config {
    pub database_url: String,
    pub observe_grace_ms: u64,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite://todo-app.db?mode=rwc".to_string()),
            observe_grace_ms: env::var("OBSERVE_GRACE_MS")
                .unwrap_or_else(|_| "5000".to_string())
                .parse()
                .expect("OBSERVE_GRACE_MS must be a number"),
        }
    }

    /// Grace period the list view-state keeps its upstream subscription
    /// alive after the last observer detaches.
    pub fn observe_grace(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.observe_grace_ms)
    }
}
