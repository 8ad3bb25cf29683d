use std::env;
use std::time::Duration;

#[derive(Debug, Clone, serde::Deserialize)]
pub struct Config {
    pub database_url: String,
    pub redis_url: String,
    pub server_host: String,
    pub server_port: u16,
    pub api_base_uri: String,
    pub gemini_api_key: String,
    pub gemini_model: String,
    pub quota_window_hours: u64,
    pub summary_cache_ttl_secs: u64,
    pub generation_timeout_secs: u64,
    pub storage_timeout_secs: u64,
}

impl Config {
    pub fn from_env() -> Result<Self, env::VarError> {
        dotenv::dotenv().ok();

        let quota_window_hours = env::var("QUOTA_WINDOW_HOURS")
            .unwrap_or_else(|_| "24".into())
            .trim_end_matches('h')
            .parse::<u64>()
            .unwrap_or(24);

        Ok(Config {
            database_url: env::var("DATABASE_URL")?,
            redis_url: env::var("REDIS_URL")?,
            server_host: env::var("SERVER_HOST")?,
            server_port: env::var("SERVER_PORT")?.parse().unwrap_or(3000),
            api_base_uri: env::var("API_BASE_URI").unwrap_or_else(|_| "/api/v1".into()),
            gemini_api_key: env::var("GEMINI_API_KEY")?,
            gemini_model: env::var("GEMINI_MODEL").unwrap_or_else(|_| "gemini-1.5-flash".into()),
            quota_window_hours,
            summary_cache_ttl_secs: env_or("SUMMARY_CACHE_TTL", 86_400),
            generation_timeout_secs: env_or("GENERATION_TIMEOUT_SECS", 30),
            storage_timeout_secs: env_or("STORAGE_TIMEOUT_SECS", 5),
        })
    }

    pub fn quota_window(&self) -> Duration {
        Duration::from_secs(self.quota_window_hours * 3600)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.summary_cache_ttl_secs)
    }

    pub fn generation_timeout(&self) -> Duration {
        Duration::from_secs(self.generation_timeout_secs)
    }

    pub fn storage_timeout(&self) -> Duration {
        Duration::from_secs(self.storage_timeout_secs)
    }
}

// 可选变量，缺失或格式错误时使用默认值
fn env_or(name: &str, default: u64) -> u64 {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
