//! Environment configuration read once at startup.

use std::collections::HashMap;
use std::env;
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use thiserror::Error;
use url::Url;
use uuid::Uuid;

use crate::domain::ToolClassMap;
use crate::outbound::storage::S3BlobStoreConfig;

/// Which detection transport the process speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportMode {
    Amqp,
    Http,
}

impl std::str::FromStr for TransportMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "amqp" => Ok(Self::Amqp),
            "http" => Ok(Self::Http),
            other => Err(ConfigError::InvalidValue {
                name: "DETECT_TRANSPORT",
                message: format!("expected \"amqp\" or \"http\", got {other:?}"),
            }),
        }
    }
}

/// Configuration failures reported before the server starts.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    MissingVar(&'static str),
    #[error("invalid value for {name}: {message}")]
    InvalidValue {
        name: &'static str,
        message: String,
    },
    #[error("failed to read tool class map {path}: {message}")]
    ClassMapIo { path: String, message: String },
}

/// AMQP transport settings.
#[derive(Debug, Clone)]
pub struct AmqpConfig {
    pub url: String,
    pub queue: String,
    pub timeout: Duration,
}

/// Direct-HTTP transport settings.
#[derive(Debug, Clone)]
pub struct HttpDetectConfig {
    pub endpoint: Url,
    pub api_key: String,
    pub timeout: Duration,
}

/// Settings for whichever transport was selected.
#[derive(Debug, Clone)]
pub enum DetectConfig {
    Amqp(AmqpConfig),
    Http(HttpDetectConfig),
}

/// Full application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub database_url: String,
    pub detect: DetectConfig,
    pub class_map: ToolClassMap,
    pub blob_store: S3BlobStoreConfig,
}

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
const DEFAULT_DETECT_QUEUE: &str = "detect_queue";
const DEFAULT_DETECT_TIMEOUT_SECS: u64 = 60;
const DEFAULT_PRESIGN_TTL_SECS: u64 = 900;

fn required(name: &'static str) -> Result<String, ConfigError> {
    env::var(name).map_err(|_| ConfigError::MissingVar(name))
}

fn parsed<T>(name: &'static str, value: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value.parse().map_err(|e: T::Err| ConfigError::InvalidValue {
        name,
        message: e.to_string(),
    })
}

impl AppConfig {
    /// Read the full configuration from the process environment.
    ///
    /// Only the variables for the selected transport are required; the
    /// other transport's settings are ignored entirely.
    pub fn from_env() -> Result<Self, ConfigError> {
        let bind_addr = env::var("BIND_ADDR").unwrap_or_else(|_| DEFAULT_BIND_ADDR.into());
        let bind_addr = parsed("BIND_ADDR", &bind_addr)?;
        let database_url = required("DATABASE_URL")?;

        let transport: TransportMode = {
            let raw = required("DETECT_TRANSPORT")?;
            raw.parse()?
        };
        let timeout_secs = match env::var("DETECT_TIMEOUT_SECS") {
            Ok(raw) => parsed("DETECT_TIMEOUT_SECS", &raw)?,
            Err(_) => DEFAULT_DETECT_TIMEOUT_SECS,
        };
        let timeout = Duration::from_secs(timeout_secs);

        let detect = match transport {
            TransportMode::Amqp => DetectConfig::Amqp(AmqpConfig {
                url: required("AMQP_URL")?,
                queue: env::var("DETECT_QUEUE").unwrap_or_else(|_| DEFAULT_DETECT_QUEUE.into()),
                timeout,
            }),
            TransportMode::Http => {
                let endpoint = required("DETECT_API_URL")?;
                DetectConfig::Http(HttpDetectConfig {
                    endpoint: parsed("DETECT_API_URL", &endpoint)?,
                    api_key: required("DETECT_API_KEY")?,
                    timeout,
                })
            }
        };

        let class_map_path = required("TOOL_CLASS_MAP_FILE")?;
        let class_map = load_class_map(Path::new(&class_map_path))?;

        let presign_ttl_secs = match env::var("PRESIGN_TTL_SECS") {
            Ok(raw) => parsed("PRESIGN_TTL_SECS", &raw)?,
            Err(_) => DEFAULT_PRESIGN_TTL_SECS,
        };
        let blob_store = S3BlobStoreConfig {
            endpoint: required("S3_ENDPOINT_URL")?,
            bucket: required("S3_BUCKET")?,
            access_key: required("S3_ACCESS_KEY")?,
            secret_key: required("S3_SECRET_KEY")?,
            region: env::var("S3_REGION").unwrap_or_else(|_| "us-east-1".into()),
            presign_ttl: Duration::from_secs(presign_ttl_secs),
        };

        Ok(Self {
            bind_addr,
            database_url,
            detect,
            class_map,
            blob_store,
        })
    }
}

/// Load the detection-class-to-tool mapping from a JSON object of
/// `"class_id": "tool uuid"` pairs.
pub fn load_class_map(path: &Path) -> Result<ToolClassMap, ConfigError> {
    let io_error = |message: String| ConfigError::ClassMapIo {
        path: path.display().to_string(),
        message,
    };
    let raw = std::fs::read_to_string(path).map_err(|e| io_error(e.to_string()))?;
    let parsed: HashMap<String, Uuid> =
        serde_json::from_str(&raw).map_err(|e| io_error(e.to_string()))?;
    let entries = parsed
        .into_iter()
        .map(|(class, tool_id)| {
            let class_id: u32 = class
                .parse()
                .map_err(|_| io_error(format!("class id {class:?} is not an integer")))?;
            Ok((class_id, tool_id))
        })
        .collect::<Result<Vec<_>, ConfigError>>()?;
    Ok(ToolClassMap::new(entries))
}
