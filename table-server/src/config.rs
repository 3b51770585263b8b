use std::env;

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub session_ttl_seconds: u64,
    pub channel_capacity: usize,
    pub sweep_interval_seconds: u64,
}

impl Config {
    pub fn new() -> Self {
        Self {
            host: env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .expect("Invalid PORT"),
            // 48 hours, renewed on every authenticated request.
            session_ttl_seconds: env::var("SESSION_TTL_SECONDS")
                .unwrap_or_else(|_| "172800".to_string())
                .parse()
                .expect("Invalid SESSION_TTL_SECONDS"),
            channel_capacity: env::var("CHANNEL_CAPACITY")
                .unwrap_or_else(|_| "32".to_string())
                .parse()
                .expect("Invalid CHANNEL_CAPACITY"),
            sweep_interval_seconds: env::var("SWEEP_INTERVAL_SECONDS")
                .unwrap_or_else(|_| "30".to_string())
                .parse()
                .expect("Invalid SWEEP_INTERVAL_SECONDS"),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}
