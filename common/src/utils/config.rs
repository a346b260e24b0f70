use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Clone, Copy, Deserialize, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingBackendKind {
    OpenAI,
    FastEmbed,
    Hashed,
}

#[derive(Clone, Copy, Deserialize, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MergePolicy {
    /// Round-robin interleave group results by rank position (default).
    Interleave,
    /// Sort all group results by score on one shared scale. Cross-type
    /// scores are not actually comparable; kept as an explicit opt-in.
    GlobalScore,
}

#[derive(Clone, Deserialize, Debug)]
pub struct AppConfig {
    pub surrealdb_address: String,
    pub surrealdb_username: String,
    pub surrealdb_password: String,
    pub surrealdb_namespace: String,
    pub surrealdb_database: String,
    pub http_port: u16,
    #[serde(default)]
    pub openai_api_key: Option<String>,
    #[serde(default = "default_base_url")]
    pub openai_base_url: String,
    #[serde(default = "default_embedding_backend")]
    pub embedding_backend: EmbeddingBackendKind,
    #[serde(default)]
    pub embedding_model: Option<String>,
    #[serde(default = "default_embedding_dimensions")]
    pub embedding_dimensions: u32,
    #[serde(default = "default_max_chunk_chars")]
    pub max_chunk_chars: usize,
    #[serde(default = "default_max_sentence_chars")]
    pub max_sentence_chars: usize,
    #[serde(default = "default_vector_batch_rows")]
    pub vector_batch_rows: usize,
    #[serde(default = "default_recall_limit")]
    pub recall_limit: usize,
    #[serde(default = "default_deletion_grace_secs")]
    pub deletion_grace_secs: u64,
    #[serde(default = "default_merge_policy")]
    pub merge_policy: MergePolicy,
}

fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

const fn default_embedding_backend() -> EmbeddingBackendKind {
    EmbeddingBackendKind::FastEmbed
}

const fn default_embedding_dimensions() -> u32 {
    384
}

const fn default_max_chunk_chars() -> usize {
    1536
}

const fn default_max_sentence_chars() -> usize {
    1024
}

const fn default_vector_batch_rows() -> usize {
    512
}

const fn default_recall_limit() -> usize {
    5
}

const fn default_deletion_grace_secs() -> u64 {
    3
}

const fn default_merge_policy() -> MergePolicy {
    MergePolicy::Interleave
}

pub fn get_config() -> Result<AppConfig, ConfigError> {
    let config = Config::builder()
        .add_source(File::with_name("config").required(false))
        .add_source(Environment::default())
        .build()?;

    config.try_deserialize()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_fill_in_the_ambient_settings() {
        let config: AppConfig = Config::builder()
            .set_override("surrealdb_address", "mem://")
            .and_then(|b| b.set_override("surrealdb_username", "root"))
            .and_then(|b| b.set_override("surrealdb_password", "root"))
            .and_then(|b| b.set_override("surrealdb_namespace", "ns"))
            .and_then(|b| b.set_override("surrealdb_database", "db"))
            .and_then(|b| b.set_override("http_port", 8080))
            .expect("overrides")
            .build()
            .expect("build")
            .try_deserialize()
            .expect("deserialize");

        assert_eq!(config.embedding_backend, EmbeddingBackendKind::FastEmbed);
        assert_eq!(config.embedding_dimensions, 384);
        assert_eq!(config.max_chunk_chars, 1536);
        assert_eq!(config.max_sentence_chars, 1024);
        assert_eq!(config.vector_batch_rows, 512);
        assert_eq!(config.recall_limit, 5);
        assert_eq!(config.deletion_grace_secs, 3);
        assert_eq!(config.merge_policy, MergePolicy::Interleave);
        assert!(config.openai_api_key.is_none());
    }
}
