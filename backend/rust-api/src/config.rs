use serde::Deserialize;
use std::env;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub azure_openai: AzureOpenAiConfig,
    pub azure_speech: AzureSpeechConfig,
    pub learning: LearningConfig,
    /// `username:password` for the /metrics endpoint
    pub metrics_auth: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AzureOpenAiConfig {
    pub endpoint: String,
    pub api_key: String,
    pub api_version: String,
    pub deployment: String,
    pub timeout_secs: u64,
    pub max_attempts: usize,
    pub temperature: f32,
}

impl AzureOpenAiConfig {
    pub fn is_configured(&self) -> bool {
        [&self.endpoint, &self.api_key, &self.deployment]
            .iter()
            .all(|field| !field.trim().is_empty())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AzureSpeechConfig {
    pub key: Option<String>,
    pub region: Option<String>,
    pub voice: String,
    pub output_format: String,
    pub timeout_secs: u64,
}

impl AzureSpeechConfig {
    pub fn is_configured(&self) -> bool {
        let present = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.trim().is_empty());
        present(&self.key) && present(&self.region)
    }
}

/// Tunables for quizzes, mastery and the adaptive-difficulty rule.
#[derive(Debug, Clone, Deserialize)]
pub struct LearningConfig {
    pub quiz_questions: usize,
    pub recommendation_window: usize,
    pub increase_threshold: f64,
    pub decrease_threshold: f64,
    pub mastery_decay: f64,
    pub pass_threshold: u8,
    pub content_cache_capacity: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
        }
    }
}

impl Default for AzureOpenAiConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            api_key: String::new(),
            api_version: "2024-12-01-preview".to_string(),
            deployment: "gpt-4.1".to_string(),
            timeout_secs: 30,
            max_attempts: 2,
            temperature: 0.7,
        }
    }
}

impl Default for AzureSpeechConfig {
    fn default() -> Self {
        Self {
            key: None,
            region: None,
            voice: "en-US-JennyNeural".to_string(),
            output_format: "audio-16khz-32kbitrate-mono-mp3".to_string(),
            timeout_secs: 15,
        }
    }
}

impl Default for LearningConfig {
    fn default() -> Self {
        Self {
            quiz_questions: 5,
            recommendation_window: 3,
            increase_threshold: 85.0,
            decrease_threshold: 50.0,
            mastery_decay: 0.7,
            pass_threshold: 60,
            content_cache_capacity: 1000,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            azure_openai: AzureOpenAiConfig::default(),
            azure_speech: AzureSpeechConfig::default(),
            learning: LearningConfig::default(),
            metrics_auth: "admin:changeme".to_string(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        dotenvy::dotenv().ok();

        // Determine environment (defaults to dev)
        let env = env::var("APP_ENV").unwrap_or_else(|_| "dev".to_string());

        // config/{env}.toml + APP__ overrides
        let settings = config::Config::builder()
            .add_source(config::File::with_name(&format!("config/{}", env)).required(false))
            .add_source(config::Environment::with_prefix("APP").separator("__"))
            .build()?;

        let defaults = Config::default();

        let string_setting = |key: &str, env_key: &str, default: &str| -> String {
            settings
                .get_string(key)
                .or_else(|_| env::var(env_key))
                .map(|value| strip_quotes(&value))
                .unwrap_or_else(|_| default.to_string())
        };

        let optional_setting = |key: &str, env_key: &str| -> Option<String> {
            settings
                .get_string(key)
                .or_else(|_| env::var(env_key))
                .ok()
                .map(|value| strip_quotes(&value))
                .filter(|value| !value.is_empty())
        };

        let azure_openai = AzureOpenAiConfig {
            endpoint: string_setting("azure_openai.endpoint", "AZURE_OPENAI_ENDPOINT", ""),
            api_key: string_setting("azure_openai.api_key", "AZURE_OPENAI_KEY", ""),
            api_version: string_setting(
                "azure_openai.api_version",
                "AZURE_OPENAI_API_VERSION",
                &defaults.azure_openai.api_version,
            ),
            deployment: string_setting(
                "azure_openai.deployment",
                "AZURE_OPENAI_LLM_DEPLOYMENT",
                &defaults.azure_openai.deployment,
            ),
            timeout_secs: settings
                .get_int("azure_openai.timeout_secs")
                .map(|v| v.max(1) as u64)
                .unwrap_or(defaults.azure_openai.timeout_secs),
            max_attempts: settings
                .get_int("azure_openai.max_attempts")
                .map(|v| v.max(1) as usize)
                .unwrap_or(defaults.azure_openai.max_attempts),
            temperature: settings
                .get_float("azure_openai.temperature")
                .map(|v| v as f32)
                .unwrap_or(defaults.azure_openai.temperature),
        };

        if !azure_openai.is_configured() {
            eprintln!(
                "WARNING: Azure OpenAI is not configured (AZURE_OPENAI_ENDPOINT, AZURE_OPENAI_KEY); \
                 lessons and quizzes will use fallback content"
            );
        }

        let azure_speech = AzureSpeechConfig {
            key: optional_setting("azure_speech.key", "AZURE_SPEECH_KEY"),
            region: optional_setting("azure_speech.region", "AZURE_SPEECH_REGION"),
            voice: string_setting(
                "azure_speech.voice",
                "AZURE_SPEECH_VOICE",
                &defaults.azure_speech.voice,
            ),
            output_format: settings
                .get_string("azure_speech.output_format")
                .unwrap_or(defaults.azure_speech.output_format),
            timeout_secs: settings
                .get_int("azure_speech.timeout_secs")
                .map(|v| v.max(1) as u64)
                .unwrap_or(defaults.azure_speech.timeout_secs),
        };

        let quiz_questions = settings
            .get_int("learning.quiz_questions")
            .ok()
            .or_else(|| {
                env::var("MAX_QUIZ_QUESTIONS")
                    .ok()
                    .and_then(|v| v.parse::<i64>().ok())
            })
            .map(|v| v.clamp(1, 10) as usize)
            .unwrap_or(defaults.learning.quiz_questions);

        let learning = LearningConfig {
            quiz_questions,
            recommendation_window: settings
                .get_int("learning.recommendation_window")
                .map(|v| v.max(1) as usize)
                .unwrap_or(defaults.learning.recommendation_window),
            increase_threshold: settings
                .get_float("learning.increase_threshold")
                .unwrap_or(defaults.learning.increase_threshold),
            decrease_threshold: settings
                .get_float("learning.decrease_threshold")
                .unwrap_or(defaults.learning.decrease_threshold),
            mastery_decay: settings
                .get_float("learning.mastery_decay")
                .map(|v| v.clamp(0.01, 1.0))
                .unwrap_or(defaults.learning.mastery_decay),
            pass_threshold: settings
                .get_int("learning.pass_threshold")
                .map(|v| v.clamp(0, 100) as u8)
                .unwrap_or(defaults.learning.pass_threshold),
            content_cache_capacity: settings
                .get_int("learning.content_cache_capacity")
                .map(|v| v.max(1) as usize)
                .unwrap_or(defaults.learning.content_cache_capacity),
        };

        let server = ServerConfig {
            host: string_setting("server.host", "MCP_HOST", &defaults.server.host),
            port: settings
                .get_int("server.port")
                .ok()
                .or_else(|| env::var("MCP_PORT").ok().and_then(|v| v.parse().ok()))
                .and_then(|v| u16::try_from(v).ok())
                .unwrap_or(defaults.server.port),
        };

        let metrics_auth = string_setting("metrics.auth", "METRICS_AUTH", &defaults.metrics_auth);

        Ok(Config {
            server,
            azure_openai,
            azure_speech,
            learning,
            metrics_auth,
        })
    }
}

/// Credentials pasted into .env files often keep their surrounding quotes.
fn strip_quotes(value: &str) -> String {
    value.replace('"', "").trim().to_string()
}
