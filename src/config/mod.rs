use serde::Deserialize;
use std::env;

// Top-level configuration container for the whole application
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub app: AppConfig,
    pub database: DatabaseConfig,
    pub jwt: JwtConfig,
    pub assistant: AssistantConfig,
    pub features: FeatureFlags,
}

// Application settings
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub environment: String,
    pub rust_log: String,
}

// Database settings
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub pool_size: u32,
}

// JWT settings
#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub expires_in_days: i64,
}

// Settings for the conversational assistant (OpenAI-compatible chat API)
#[derive(Debug, Clone, Deserialize)]
pub struct AssistantConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    // Local offset used to resolve "today" / "tomorrow" in user requests
    pub utc_offset_hours: i32,
}

// Feature flags
#[derive(Debug, Clone, Deserialize)]
pub struct FeatureFlags {
    pub enable_assistant: bool,
}

impl Config {
    pub fn from_env() -> Self {
        Config {
            app: AppConfig {
                host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: env::var("PORT")
                    .unwrap_or_else(|_| "5001".to_string())
                    .parse()
                    .expect("PORT must be a valid number"),
                environment: env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),
                rust_log: env::var("RUST_LOG")
                    .unwrap_or_else(|_| "cinema_booking=debug,tower_http=debug".to_string()),
            },
            database: DatabaseConfig {
                url: env::var("DATABASE_URL").expect("DATABASE_URL must be set"),
                pool_size: env::var("DB_POOL_SIZE")
                    .unwrap_or_else(|_| "20".to_string())
                    .parse()
                    .expect("DB_POOL_SIZE must be a valid number"),
            },
            jwt: JwtConfig {
                secret: env::var("JWT_SECRET").expect("JWT_SECRET must be set"),
                expires_in_days: env::var("JWT_EXPIRES_IN_DAYS")
                    .unwrap_or_else(|_| "7".to_string())
                    .parse()
                    .expect("JWT_EXPIRES_IN_DAYS must be a valid number"),
            },
            assistant: AssistantConfig {
                api_key: env::var("GROQ_API_KEY").unwrap_or_default(),
                base_url: env::var("GROQ_BASE_URL")
                    .unwrap_or_else(|_| "https://api.groq.com/openai/v1".to_string()),
                model: env::var("GROQ_MODEL")
                    .unwrap_or_else(|_| "llama-3.1-8b-instant".to_string()),
                utc_offset_hours: env::var("LOCAL_UTC_OFFSET_HOURS")
                    .unwrap_or_else(|_| "7".to_string())
                    .parse()
                    .expect("LOCAL_UTC_OFFSET_HOURS must be a valid number"),
            },
            features: FeatureFlags {
                enable_assistant: env::var("ENABLE_ASSISTANT")
                    .unwrap_or_else(|_| "true".to_string())
                    .parse()
                    .expect("ENABLE_ASSISTANT must be true or false"),
            },
        }
    }
}
