use crate::error::{to_env_var, ConfigError};
use config::{Config, Environment};
use proteus::agent::AgentConfig;
use proteus::clients::qdrant::{QdrantConfig, QDRANT_HOST};
use proteus::clients::searxng::{SearxngConfig, SEARXNG_HOST};
use proteus::providers::configs::OllamaProviderConfig;
use serde::Deserialize;
use std::net::{AddrParseError, SocketAddr};
use std::time::Duration;

/// Settings that have no sensible default
const REQUIRED: &[&str] = &["ollama.url", "ollama.num_ctx", "models.agent", "models.embedding"];

#[derive(Debug, Deserialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

impl ServerSettings {
    pub fn socket_addr(&self) -> Result<SocketAddr, AddrParseError> {
        format!("{}:{}", self.host, self.port).parse()
    }
}

#[derive(Debug, Deserialize)]
pub struct OllamaSettings {
    pub url: String,
    pub num_ctx: u32,
    pub generate_timeout_secs: u64,
    pub embed_timeout_secs: u64,
}

impl OllamaSettings {
    pub fn provider_config(&self) -> OllamaProviderConfig {
        let mut config = OllamaProviderConfig::new(&self.url).with_num_ctx(self.num_ctx);
        config.generate_timeout = Duration::from_secs(self.generate_timeout_secs);
        config.embed_timeout = Duration::from_secs(self.embed_timeout_secs);
        config
    }
}

#[derive(Debug, Deserialize)]
pub struct QdrantSettings {
    pub url: String,
    pub timeout_secs: u64,
    pub upsert_timeout_secs: u64,
}

impl QdrantSettings {
    pub fn client_config(&self) -> QdrantConfig {
        let mut config = QdrantConfig::new(&self.url);
        config.timeout = Duration::from_secs(self.timeout_secs);
        config.upsert_timeout = Duration::from_secs(self.upsert_timeout_secs);
        config
    }
}

#[derive(Debug, Deserialize)]
pub struct SearxngSettings {
    pub url: String,
    pub timeout_secs: u64,
}

impl SearxngSettings {
    pub fn client_config(&self) -> SearxngConfig {
        let mut config = SearxngConfig::new(&self.url);
        config.timeout = Duration::from_secs(self.timeout_secs);
        config
    }
}

/// Model names per agent role. Roles left unset use the agent model.
#[derive(Debug, Deserialize)]
pub struct ModelSettings {
    pub agent: String,
    pub embedding: String,
    #[serde(default)]
    pub interpreter: Option<String>,
    #[serde(default)]
    pub research: Option<String>,
    #[serde(default)]
    pub synthesis: Option<String>,
    #[serde(default)]
    pub critic: Option<String>,
    /// Model id that OpenAI clients use to reach the orchestration instead of a raw model
    pub alias: String,
}

#[derive(Debug, Deserialize)]
pub struct AgentSettings {
    pub vector_size: usize,
}

#[derive(Debug, Deserialize)]
pub struct LoggingSettings {
    pub log_agent_output: bool,
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub server: ServerSettings,
    pub ollama: OllamaSettings,
    pub qdrant: QdrantSettings,
    pub searxng: SearxngSettings,
    pub models: ModelSettings,
    pub agent: AgentSettings,
    pub logging: LoggingSettings,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        Self::load_and_validate()
    }

    pub fn agent_config(&self) -> AgentConfig {
        let models = &self.models;
        let role = |model: &Option<String>| model.clone().unwrap_or_else(|| models.agent.clone());

        AgentConfig::new(&models.agent, &models.embedding)
            .with_interpreter_model(role(&models.interpreter))
            .with_research_model(role(&models.research))
            .with_synthesis_model(role(&models.synthesis))
            .with_critic_model(role(&models.critic))
            .with_vector_size(self.agent.vector_size)
    }

    fn load_and_validate() -> Result<Self, ConfigError> {
        let config = Config::builder()
            .set_default("server.host", default_host())?
            .set_default("server.port", default_port())?
            .set_default("ollama.generate_timeout_secs", 300)?
            .set_default("ollama.embed_timeout_secs", 60)?
            .set_default("qdrant.url", QDRANT_HOST)?
            .set_default("qdrant.timeout_secs", 30)?
            .set_default("qdrant.upsert_timeout_secs", 60)?
            .set_default("searxng.url", SEARXNG_HOST)?
            .set_default("searxng.timeout_secs", 30)?
            .set_default("models.alias", "proteus")?
            .set_default("agent.vector_size", 768)?
            .set_default("logging.log_agent_output", true)?
            .add_source(
                Environment::with_prefix("PROTEUS")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        for key in REQUIRED {
            if let Err(config::ConfigError::NotFound(_)) = config.get_string(key) {
                return Err(ConfigError::MissingEnvVar {
                    env_var: to_env_var(key),
                });
            }
        }

        let result: Result<Self, config::ConfigError> = config.try_deserialize();

        match result {
            Ok(settings) => Ok(settings),
            Err(err) => {
                tracing::debug!("Configuration error: {:?}", &err);

                let error_str = err.to_string();
                if error_str.starts_with("missing field") {
                    // "missing field `name`"
                    let field = error_str
                        .trim_start_matches("missing field `")
                        .trim_end_matches('`');
                    Err(ConfigError::MissingEnvVar {
                        env_var: to_env_var(field),
                    })
                } else if let config::ConfigError::NotFound(field) = &err {
                    Err(ConfigError::MissingEnvVar {
                        env_var: to_env_var(field),
                    })
                } else {
                    Err(ConfigError::Other(err))
                }
            }
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8000
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::env;

    fn clean_env() {
        for (key, _) in env::vars() {
            if key.starts_with("PROTEUS_") {
                env::remove_var(&key);
            }
        }
    }

    fn set_required() {
        env::set_var("PROTEUS_OLLAMA__URL", "http://ollama:11434");
        env::set_var("PROTEUS_OLLAMA__NUM_CTX", "16384");
        env::set_var("PROTEUS_MODELS__AGENT", "qwen3:14b");
        env::set_var("PROTEUS_MODELS__EMBEDDING", "nomic-embed-text");
    }

    #[test]
    #[serial]
    fn test_default_settings() {
        clean_env();
        set_required();

        let settings = Settings::new().unwrap();
        assert_eq!(settings.server.host, "127.0.0.1");
        assert_eq!(settings.server.port, 8000);
        assert_eq!(settings.ollama.url, "http://ollama:11434");
        assert_eq!(settings.ollama.num_ctx, 16384);
        assert_eq!(settings.qdrant.url, "http://localhost:6333");
        assert_eq!(settings.searxng.url, "http://localhost:8080");
        assert_eq!(settings.models.alias, "proteus");
        assert!(settings.logging.log_agent_output);

        let ollama = settings.ollama.provider_config();
        assert_eq!(ollama.num_ctx, Some(16384));
        assert_eq!(ollama.generate_timeout, Duration::from_secs(300));
        assert_eq!(ollama.embed_timeout, Duration::from_secs(60));
        assert_eq!(
            settings.qdrant.client_config().upsert_timeout,
            Duration::from_secs(60)
        );

        let agent = settings.agent_config();
        assert_eq!(agent.interpreter_model, "qwen3:14b");
        assert_eq!(agent.critic_model, "qwen3:14b");
        assert_eq!(agent.embedding_model, "nomic-embed-text");
        assert_eq!(agent.vector_size, 768);

        clean_env();
    }

    #[test]
    #[serial]
    fn test_missing_required_setting_names_env_var() {
        for missing in REQUIRED {
            clean_env();
            set_required();
            env::remove_var(to_env_var(missing));

            match Settings::new() {
                Err(ConfigError::MissingEnvVar { env_var }) => {
                    assert_eq!(env_var, to_env_var(missing))
                }
                other => panic!("Expected MissingEnvVar for {}, got {:?}", missing, other),
            }
        }
        clean_env();
    }

    #[test]
    #[serial]
    fn test_environment_override() {
        clean_env();
        set_required();
        env::set_var("PROTEUS_SERVER__PORT", "9000");
        env::set_var("PROTEUS_SERVER__HOST", "0.0.0.0");
        env::set_var("PROTEUS_QDRANT__URL", "http://qdrant:6333");
        env::set_var("PROTEUS_MODELS__CRITIC", "qwen2.5:7b");
        env::set_var("PROTEUS_MODELS__ALIAS", "gateway");
        env::set_var("PROTEUS_SEARXNG__TIMEOUT_SECS", "5");
        env::set_var("PROTEUS_LOGGING__LOG_AGENT_OUTPUT", "false");

        let settings = Settings::new().unwrap();
        assert_eq!(settings.server.port, 9000);
        assert_eq!(settings.server.socket_addr().unwrap().to_string(), "0.0.0.0:9000");
        assert_eq!(settings.qdrant.url, "http://qdrant:6333");
        assert_eq!(settings.models.alias, "gateway");
        assert_eq!(
            settings.searxng.client_config().timeout,
            Duration::from_secs(5)
        );
        assert!(!settings.logging.log_agent_output);

        let agent = settings.agent_config();
        assert_eq!(agent.critic_model, "qwen2.5:7b");
        assert_eq!(agent.synthesis_model, "qwen3:14b");

        clean_env();
    }

    #[test]
    fn test_socket_addr_conversion() {
        let server_settings = ServerSettings {
            host: "127.0.0.1".to_string(),
            port: 8000,
        };
        let addr = server_settings.socket_addr().unwrap();
        assert_eq!(addr.to_string(), "127.0.0.1:8000");

        let server_settings = ServerSettings {
            host: "not a host".to_string(),
            port: 8000,
        };
        assert!(server_settings.socket_addr().is_err());
    }
}
