//! Application state

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use minerva_core::{BookMetadata, LogSink, Resolver, ResolverConfig};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

pub const ENV_STORAGE_PATH: &str = "MINERVA_STORAGE_PATH";
pub const ENV_BIND_ADDR: &str = "MINERVA_BIND_ADDR";

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// ISBN resolver shared by every request
    pub resolver: Resolver,

    /// Base path for storage
    pub storage_path: PathBuf,

    /// Catalog of saved books
    pub library: Arc<RwLock<Library>>,
}

/// Catalog of saved books, keyed by entry ID
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Library {
    pub books: HashMap<String, BookEntry>,
}

/// A saved book
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookEntry {
    pub id: String,
    pub isbn: String,
    pub metadata: BookMetadata,
    pub added_at: DateTime<Utc>,
}

impl Library {
    /// Load library from a JSON file
    pub async fn load(path: &Path) -> Result<Self> {
        // Read file directly, handle NotFound as empty library
        match tokio::fs::read_to_string(path).await {
            Ok(data) => Ok(serde_json::from_str(&data)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(e.into()),
        }
    }

    /// Save library to a JSON file atomically
    ///
    /// Writes to a uniquely named temp file then renames it over `path`.
    /// Callers must hold the library write lock so saves never interleave.
    pub async fn save(&self, path: &Path) -> Result<()> {
        let data = serde_json::to_string_pretty(self)?;

        let temp_path = path.with_extension(format!("json.{}.tmp", Uuid::new_v4().simple()));
        tokio::fs::write(&temp_path, &data).await?;
        if let Err(e) = tokio::fs::rename(&temp_path, path).await {
            let _ = tokio::fs::remove_file(&temp_path).await;
            return Err(e.into());
        }
        Ok(())
    }

    /// Find the entry saved for an ISBN
    pub fn find_by_isbn(&self, isbn: &str) -> Option<&BookEntry> {
        self.books.values().find(|entry| entry.isbn == isbn)
    }
}

/// Server settings read from the environment
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub storage_path: PathBuf,
    pub bind_addr: SocketAddr,
    pub resolver: ResolverConfig,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self> {
        let storage_path = std::env::var(ENV_STORAGE_PATH)
            .unwrap_or_else(|_| "./minerva_data".to_string())
            .into();

        let bind_addr = match std::env::var(ENV_BIND_ADDR) {
            Ok(addr) => addr
                .parse()
                .with_context(|| format!("Invalid {}: {}", ENV_BIND_ADDR, addr))?,
            Err(_) => SocketAddr::from(([127, 0, 0, 1], 3000)),
        };

        let resolver = ResolverConfig::from_env().context("Invalid resolver configuration")?;

        Ok(Self {
            storage_path,
            bind_addr,
            resolver,
        })
    }
}

impl AppState {
    /// Create application state from configuration
    pub async fn new(config: &ServerConfig) -> Result<Self> {
        let log_sink = LogSink::new(config.resolver.log_capacity);
        let resolver = Resolver::from_config(config.resolver.clone(), log_sink)
            .context("Failed to create resolver")?;

        Self::with_resolver(resolver, config.storage_path.clone()).await
    }

    /// Create application state around an existing resolver
    pub async fn with_resolver(resolver: Resolver, storage_path: PathBuf) -> Result<Self> {
        tokio::fs::create_dir_all(&storage_path).await?;

        let library_path = storage_path.join("library.json");
        let library = match Library::load(&library_path).await {
            Ok(lib) => lib,
            Err(e) => {
                tracing::warn!("Failed to load library index, starting fresh: {}", e);
                Library::default()
            }
        };

        Ok(Self {
            resolver,
            storage_path,
            library: Arc::new(RwLock::new(library)),
        })
    }

    /// Get path to library index file
    pub fn library_path(&self) -> PathBuf {
        self.storage_path.join("library.json")
    }


    /// The diagnostic channel shared with the resolver
    pub fn log_sink(&self) -> &LogSink {
        self.resolver.log_sink()
    }
}
