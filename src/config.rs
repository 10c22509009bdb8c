use std::env;
use std::fmt;

/// Application configuration
#[derive(Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub openai_api_key: String,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .expect("PORT must be a valid number"),
            log_level: env::var("RUST_LOG")
                .unwrap_or_else(|_| "rs_persona_svc=info,tower_http=debug".to_string()),
            openai_api_key: env::var("OPENAI_API_KEY").unwrap_or_default(),
        }
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn server_url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }
}

// Manual Debug so the API key never lands in the startup log.
impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("log_level", &self.log_level)
            .field(
                "openai_api_key",
                if self.openai_api_key.is_empty() {
                    &"<unset>"
                } else {
                    &"***"
                },
            )
            .finish()
    }
}
