/// Trait for loading service configuration from environment variables.
///
/// Implementors derive `serde::Deserialize`; field names map to upper-case
/// env vars (`database_url` ← `DATABASE_URL`). A `.env` file in the working
/// directory is loaded first when present.
///
/// # Panics
///
/// Panics if any required env var is missing or cannot be deserialized.
pub trait Config: Sized + serde::de::DeserializeOwned {
    fn from_env() -> Self {
        let _ = dotenvy::dotenv();
        envy::from_env().unwrap_or_else(|e| panic!("failed to load config from environment: {e}"))
    }
}
