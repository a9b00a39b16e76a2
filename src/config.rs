use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
    pub refresh_ttl_minutes: i64,
}

/// API keys for the two upstream LLM providers. Either may be absent;
/// an unconfigured provider answers with a structured error instead of
/// failing startup.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProviderConfig {
    pub groq_api_key: Option<String>,
    pub gemini_api_key: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub jwt: JwtConfig,
    pub providers: ProviderConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")?;
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET")?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "ai-comparator".into()),
            audience: std::env::var("JWT_AUDIENCE")
                .unwrap_or_else(|_| "ai-comparator-users".into()),
            ttl_minutes: std::env::var("JWT_TTL_MINUTES")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(60),
            refresh_ttl_minutes: std::env::var("JWT_REFRESH_TTL_MINUTES")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(60 * 24 * 14),
        };
        let providers = ProviderConfig {
            groq_api_key: std::env::var("GROQ_API_KEY").ok().filter(|k| !k.is_empty()),
            gemini_api_key: std::env::var("GEMINI_API_KEY")
                .ok()
                .filter(|k| !k.is_empty()),
        };
        Ok(Self {
            database_url,
            jwt,
            providers,
        })
    }
}
