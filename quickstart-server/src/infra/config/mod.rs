pub mod loader;
pub mod models;
pub mod sources;
pub mod validation;

pub use loader::{ConfigLoad, ConfigLoadError, ConfigLoader, ConfigLoaderOptions};
pub use models::{
    Config, ConfigMetadata, CorsConfig, DatabaseConfig, ServerConfig, StorageBackend,
    StorageConfig, UnknownStorageBackend,
};
pub use validation::{ConfigWarning, ConfigWarnings};
