#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub revocation: RevocationConfig,
    pub cors: CorsConfig,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
}

#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    /// Access-token lifetime in seconds.
    pub token_ttl_secs: i64,
}

/// Sizing of the in-memory revocation filter.
#[derive(Debug, Clone, Copy)]
pub struct RevocationConfig {
    /// Backing size hint in bytes; the filter holds eight bits per byte.
    pub capacity_hint: usize,
    /// Independent hash rounds per token.
    pub hash_count: u32,
}

#[derive(Debug, Clone)]
pub struct CorsConfig {
    pub allowed_origins: Vec<String>,
}

impl CorsConfig {
    pub fn is_wildcard_included(&self) -> bool {
        self.allowed_origins
            .iter()
            .any(|origin| origin.trim() == "*")
    }
}
