/// Environment variable consulted when no key is given explicitly
pub const API_KEY_ENV: &str = "MAP_API_KEY";

/// Fatal problems found before any provider call is made
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A paid provider was selected without a key
    #[error("{provider} requires an API key: pass --api-key or set MAP_API_KEY")]
    MissingApiKey { provider: &'static str },

    /// A selected column does not exist in the input table
    #[error("Column '{column}' not found in the input table")]
    MissingColumn { column: String },

    /// No row of the input carries a usable coordinate pair
    #[error("No valid coordinates found in columns '{latitude}' and '{longitude}'")]
    NoValidCoordinates { latitude: String, longitude: String },

    #[error("Unknown provider '{0}' (expected locationiq, google or nominatim)")]
    UnknownProvider(String),
}

/// Picks the explicit key if present, otherwise reads `MAP_API_KEY`
pub fn resolve_api_key(explicit: Option<String>) -> Option<String> {
    explicit
        .map(|k| k.trim().to_string())
        .filter(|k| !k.is_empty())
        .or_else(api_key_from_env)
}

/// Key from the environment, ignoring blank values
pub fn api_key_from_env() -> Option<String> {
    std::env::var(API_KEY_ENV)
        .ok()
        .map(|k| k.trim().to_string())
        .filter(|k| !k.is_empty())
}
