use axum::http::{HeaderName, Method};
use once_cell::sync::Lazy;
use std::{fs, path::PathBuf};
use thiserror::Error;
use url::Url;

use super::{
    models::{
        Config, ConfigMetadata, CorsConfig, DEFAULT_HOST, DEFAULT_MAX_CONNECTIONS, DEFAULT_PORT,
        DatabaseConfig, ServerConfig, StorageBackend, StorageConfig, UnknownStorageBackend,
        default_cors_headers, default_cors_methods, default_cors_origins,
    },
    sources::{EnvConfig, FileConfig},
    validation::ConfigWarnings,
};

static DEFAULT_CONFIG_LOCATIONS: Lazy<Vec<PathBuf>> = Lazy::new(|| {
    vec![
        PathBuf::from("quickstart.toml"),
        PathBuf::from("config/quickstart.toml"),
    ]
});

#[derive(Debug, Default, Clone)]
pub struct ConfigLoaderOptions {
    pub config_path: Option<PathBuf>,
    pub env_file: Option<PathBuf>,
}

#[derive(Debug, Default)]
pub struct ConfigLoader {
    options: ConfigLoaderOptions,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: ConfigLoaderOptions) -> Self {
        Self { options }
    }

    pub fn with_config_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.options.config_path = Some(path.into());
        self
    }

    /// Load `.env`, then the TOML file, then the process environment.
    pub fn load(&self) -> Result<ConfigLoad, ConfigLoadError> {
        let env_file_loaded = match &self.options.env_file {
            Some(path) => dotenvy::from_path(path).map(|_| true).or_else(|err| match err {
                dotenvy::Error::Io(_) => Ok(false),
                _ => Err(err),
            })?,
            None => dotenvy::dotenv().map(|_| true).or_else(|err| match err {
                dotenvy::Error::Io(_) => Ok(false),
                _ => Err(err),
            })?,
        };

        let mut load = self.load_with_env(EnvConfig::gather())?;
        load.config.metadata.env_file_loaded = env_file_loaded;
        Ok(load)
    }

    /// Compose configuration from an already gathered environment. Does not
    /// touch `.env` files.
    pub fn load_with_env(&self, env: EnvConfig) -> Result<ConfigLoad, ConfigLoadError> {
        let (file_config, config_path) = self.load_file_config(&env)?;
        let (config, warnings) = compose_config(file_config, env, config_path)?;
        Ok(ConfigLoad { config, warnings })
    }

    fn load_file_config(
        &self,
        env: &EnvConfig,
    ) -> Result<(Option<FileConfig>, Option<PathBuf>), ConfigLoadError> {
        let (path, explicit) = if let Some(path) = &self.options.config_path {
            (Some(path.clone()), true)
        } else if let Some(path) = &env.config_path {
            (Some(path.clone()), true)
        } else {
            let found = DEFAULT_CONFIG_LOCATIONS
                .iter()
                .find(|candidate| candidate.exists())
                .cloned();
            (found, false)
        };

        let Some(path) = path else {
            return Ok((None, None));
        };

        if !path.exists() {
            if explicit {
                return Err(ConfigLoadError::MissingConfig { path });
            }
            return Ok((None, None));
        }

        let contents = fs::read_to_string(&path).map_err(|source| ConfigLoadError::Io {
            path: path.clone(),
            source,
        })?;
        let file_config: FileConfig =
            toml::from_str(&contents).map_err(|source| ConfigLoadError::Parse {
                path: path.clone(),
                source,
            })?;

        Ok((Some(file_config), Some(path)))
    }
}

fn compose_config(
    file_config: Option<FileConfig>,
    env: EnvConfig,
    config_path: Option<PathBuf>,
) -> Result<(Config, ConfigWarnings), ConfigLoadError> {
    let mut warnings = ConfigWarnings::default();
    let FileConfig {
        server: file_server,
        storage: file_storage,
        database: file_database,
        cors: file_cors,
        dev_mode: file_dev_mode,
    } = file_config.unwrap_or_default();

    let port = match env.server_port.as_deref() {
        Some(raw) => raw
            .trim()
            .parse::<u16>()
            .map_err(|_| ConfigLoadError::InvalidNumber {
                key: "SERVER_PORT",
                value: raw.to_string(),
            })?,
        None => file_server.port.unwrap_or(DEFAULT_PORT),
    };
    let server = ServerConfig {
        host: env
            .server_host
            .or(file_server.host)
            .unwrap_or_else(|| DEFAULT_HOST.to_string()),
        port,
    };

    let database_url = env
        .database_url
        .or(file_database.url)
        .map(|raw| raw.trim().to_string())
        .filter(|raw| !raw.is_empty())
        .map(|raw| validate_database_url(&raw).map(|_| raw))
        .transpose()?;

    let max_connections = match env.db_max_connections.as_deref() {
        Some(raw) => raw
            .trim()
            .parse::<u32>()
            .map_err(|_| ConfigLoadError::InvalidNumber {
                key: "DB_MAX_CONNECTIONS",
                value: raw.to_string(),
            })?,
        None => file_database
            .max_connections
            .unwrap_or(DEFAULT_MAX_CONNECTIONS),
    };
    if max_connections == 0 {
        return Err(ConfigLoadError::InvalidNumber {
            key: "DB_MAX_CONNECTIONS",
            value: "0".to_string(),
        });
    }

    let requested_backend = match env.storage_backend.as_deref() {
        Some(raw) => Some(raw.parse::<StorageBackend>()?),
        None => file_storage.backend,
    };
    let backend = match (requested_backend, database_url.is_some()) {
        (Some(StorageBackend::Postgres), false) => {
            return Err(ConfigLoadError::MissingDatabaseUrl);
        }
        (Some(backend), _) => backend,
        (None, true) => StorageBackend::Postgres,
        (None, false) => {
            warnings.push_with_hint(
                "No database URL configured; user documents are kept in memory and lost on exit",
                "Set DATABASE_URL or [database].url to persist users in PostgreSQL",
            );
            StorageBackend::Memory
        }
    };

    let dev_mode = env.dev_mode.or(file_dev_mode).unwrap_or(false);

    let cors = CorsConfig {
        allowed_origins: env
            .cors_allowed_origins
            .or(file_cors.allowed_origins)
            .unwrap_or_else(default_cors_origins),
        allowed_methods: env
            .cors_allowed_methods
            .or(file_cors.allowed_methods)
            .unwrap_or_else(default_cors_methods),
        allowed_headers: env
            .cors_allowed_headers
            .or(file_cors.allowed_headers)
            .unwrap_or_else(default_cors_headers),
        allow_credentials: env
            .cors_allow_credentials
            .or(file_cors.allow_credentials)
            .unwrap_or(false),
    };
    validate_cors(&cors, dev_mode, &mut warnings)?;

    let config = Config {
        server,
        storage: StorageConfig { backend },
        database: DatabaseConfig {
            url: database_url,
            max_connections,
        },
        cors,
        dev_mode,
        metadata: ConfigMetadata {
            config_path,
            env_file_loaded: false,
        },
    };

    Ok((config, warnings))
}

fn validate_database_url(raw: &str) -> Result<(), ConfigLoadError> {
    let parsed = Url::parse(raw).map_err(|source| ConfigLoadError::InvalidDatabaseUrl { source })?;
    match parsed.scheme() {
        "postgres" | "postgresql" => Ok(()),
        other => Err(ConfigLoadError::UnsupportedDatabaseScheme {
            scheme: other.to_string(),
        }),
    }
}

fn validate_cors(
    cors: &CorsConfig,
    dev_mode: bool,
    warnings: &mut ConfigWarnings,
) -> Result<(), ConfigLoadError> {
    for method in &cors.allowed_methods {
        Method::from_bytes(method.as_bytes()).map_err(|_| ConfigLoadError::InvalidCorsMethod {
            method: method.clone(),
        })?;
    }
    for header in &cors.allowed_headers {
        HeaderName::from_bytes(header.as_bytes()).map_err(|_| {
            ConfigLoadError::InvalidCorsHeader {
                header: header.clone(),
            }
        })?;
    }

    if cors.is_wildcard_included() && cors.allow_credentials {
        return Err(ConfigLoadError::WildcardWithCredentials);
    }
    if !dev_mode && cors.is_wildcard_included() {
        warnings.push_with_hint(
            "CORS allows any origin",
            "List explicit origins in CORS_ALLOWED_ORIGINS for production deployments",
        );
    }

    Ok(())
}

#[derive(Debug, Error)]
pub enum ConfigLoadError {
    #[error("configuration file missing: {path}")]
    MissingConfig { path: PathBuf },
    #[error("failed to read configuration {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse configuration {path}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid value '{value}' for {key}")]
    InvalidNumber { key: &'static str, value: String },
    #[error(transparent)]
    StorageBackend(#[from] UnknownStorageBackend),
    #[error("postgres storage selected but no database URL is configured")]
    MissingDatabaseUrl,
    #[error("invalid database URL")]
    InvalidDatabaseUrl {
        #[source]
        source: url::ParseError,
    },
    #[error("unsupported database URL scheme '{scheme}'")]
    UnsupportedDatabaseScheme { scheme: String },
    #[error("invalid CORS method '{method}'")]
    InvalidCorsMethod { method: String },
    #[error("invalid CORS header '{header}'")]
    InvalidCorsHeader { header: String },
    #[error("CORS cannot allow credentials for a wildcard origin")]
    WildcardWithCredentials,
    #[error(transparent)]
    EnvFile(#[from] dotenvy::Error),
}

#[derive(Debug)]
pub struct ConfigLoad {
    pub config: Config,
    pub warnings: ConfigWarnings,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{collections::HashMap, io::Write};

    fn env_from(pairs: &[(&str, &str)]) -> EnvConfig {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        EnvConfig::from_lookup(|name| vars.get(name).cloned())
    }

    fn write_config(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new()
            .suffix(".toml")
            .tempfile()
            .expect("create temp config");
        file.write_all(contents.as_bytes()).expect("write config");
        file
    }

    #[test]
    fn empty_environment_falls_back_to_memory_with_warning() {
        let load = ConfigLoader::new()
            .load_with_env(EnvConfig::default())
            .unwrap();

        assert_eq!(load.config.bind_address(), "0.0.0.0:8000");
        assert_eq!(load.config.storage.backend, StorageBackend::Memory);
        assert_eq!(load.config.database.max_connections, DEFAULT_MAX_CONNECTIONS);
        assert_eq!(load.warnings.len(), 1);
        assert!(load.warnings.items[0].hint.is_some());
    }

    #[test]
    fn database_url_selects_postgres() {
        let env = env_from(&[("DATABASE_URL", "postgres://app:secret@db:5432/users")]);
        let load = ConfigLoader::new().load_with_env(env).unwrap();

        assert_eq!(load.config.storage.backend, StorageBackend::Postgres);
        assert_eq!(
            load.config.database.url.as_deref(),
            Some("postgres://app:secret@db:5432/users")
        );
        assert!(load.warnings.is_empty());
    }

    #[test]
    fn environment_overrides_file_values() {
        let file = write_config(
            r#"
            dev_mode = true

            [server]
            host = "127.0.0.1"
            port = 9000

            [database]
            url = "postgresql://localhost/users"
            max_connections = 4

            [cors]
            allowed_origins = ["https://users.example.com"]
            "#,
        );
        let env = env_from(&[("SERVER_PORT", "9100"), ("STORAGE_BACKEND", "memory")]);

        let load = ConfigLoader::new()
            .with_config_path(file.path())
            .load_with_env(env)
            .unwrap();
        let config = load.config;

        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 9100);
        assert_eq!(config.storage.backend, StorageBackend::Memory);
        assert_eq!(config.database.max_connections, 4);
        assert_eq!(config.cors.allowed_origins, ["https://users.example.com"]);
        assert!(config.dev_mode);
        assert_eq!(config.metadata.config_path.as_deref(), Some(file.path()));
    }

    #[test]
    fn config_path_from_environment_must_exist() {
        let env = env_from(&[("QUICKSTART_CONFIG", "/nonexistent/quickstart.toml")]);
        let err = ConfigLoader::new().load_with_env(env).unwrap_err();
        assert!(matches!(err, ConfigLoadError::MissingConfig { .. }));
    }

    #[test]
    fn malformed_toml_is_reported_with_path() {
        let file = write_config("[server\nport = ");
        let err = ConfigLoader::new()
            .with_config_path(file.path())
            .load_with_env(EnvConfig::default())
            .unwrap_err();
        assert!(matches!(err, ConfigLoadError::Parse { ref path, .. } if path == file.path()));
    }

    #[test]
    fn postgres_without_url_is_rejected() {
        let env = env_from(&[("STORAGE_BACKEND", "postgres")]);
        let err = ConfigLoader::new().load_with_env(env).unwrap_err();
        assert!(matches!(err, ConfigLoadError::MissingDatabaseUrl));
    }

    #[test]
    fn invalid_values_are_rejected() {
        let cases = [
            ("STORAGE_BACKEND", "mongo"),
            ("SERVER_PORT", "eighty"),
            ("DB_MAX_CONNECTIONS", "0"),
            ("DATABASE_URL", "not a url"),
            ("DATABASE_URL", "mysql://localhost/users"),
            ("CORS_ALLOWED_METHODS", "GET,NOT A METHOD"),
        ];

        for (key, value) in cases {
            let result = ConfigLoader::new().load_with_env(env_from(&[(key, value)]));
            assert!(result.is_err(), "{key}={value} should be rejected");
        }
    }

    #[test]
    fn wildcard_origin_warns_outside_dev_mode() {
        let env = env_from(&[
            ("CORS_ALLOWED_ORIGINS", "*"),
            ("STORAGE_BACKEND", "memory"),
        ]);
        let load = ConfigLoader::new().load_with_env(env).unwrap();
        assert!(load.warnings.iter().any(|w| w.message.contains("any origin")));

        let env = env_from(&[
            ("CORS_ALLOWED_ORIGINS", "*"),
            ("CORS_ALLOW_CREDENTIALS", "true"),
        ]);
        let err = ConfigLoader::new().load_with_env(env).unwrap_err();
        assert!(matches!(err, ConfigLoadError::WildcardWithCredentials));
    }
}
