use std::path::PathBuf;
use std::sync::Arc;

use crate::config::{DatabaseBackend, DatabaseConfig};
use crate::database::{Database, IdentityBackend, MemoryDatabase};

/// Returns the path to the contacts database
///
/// Uses `database.path` from the config when set, otherwise the platform
/// data directory:
///
/// - **macOS**: `~/Library/Application Support/idrecon/contacts.sqlite3`
/// - **Linux**: `~/.local/share/idrecon/contacts.sqlite3`
/// - **Windows**: `%LOCALAPPDATA%\idrecon\contacts.sqlite3`
pub fn get_db_path(config: &DatabaseConfig) -> anyhow::Result<PathBuf> {
    if let Some(path) = &config.path {
        return Ok(path.clone());
    }

    let data_dir = dirs::data_local_dir()
        .ok_or_else(|| anyhow::anyhow!("Could not determine local data directory"))?;

    Ok(data_dir.join("idrecon").join("contacts.sqlite3"))
}

/// Open the configured identity backend
pub fn initialize_backend(
    config: &DatabaseConfig,
    reset: bool,
) -> anyhow::Result<Arc<dyn IdentityBackend>> {
    match config.backend {
        DatabaseBackend::Sqlite => {
            let db_path = get_db_path(config)?;
            let db = Database::new(&db_path, config.pool_size)?;
            if reset {
                db.reset()?;
            }
            tracing::info!("SQLite contact database at {}", db_path.display());
            Ok(Arc::new(db))
        }
        DatabaseBackend::Memory => {
            tracing::warn!("Using in-memory contact store, contacts are lost on exit");
            Ok(Arc::new(MemoryDatabase::new()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::IdentifyRequest;

    #[test]
    fn test_configured_path_wins() {
        let config = DatabaseConfig {
            path: Some(PathBuf::from("/tmp/idrecon/test.sqlite3")),
            ..DatabaseConfig::default()
        };
        assert_eq!(
            get_db_path(&config).unwrap(),
            PathBuf::from("/tmp/idrecon/test.sqlite3")
        );
    }

    #[test]
    fn test_reset_on_startup() {
        let dir = tempfile::tempdir().unwrap();
        let config = DatabaseConfig {
            path: Some(dir.path().join("contacts.sqlite3")),
            ..DatabaseConfig::default()
        };

        let backend = initialize_backend(&config, false).unwrap();
        backend
            .identify(&IdentifyRequest::new(Some("a@x.com"), None))
            .unwrap();
        drop(backend);

        let backend = initialize_backend(&config, true).unwrap();
        let response = backend
            .identify(&IdentifyRequest::new(None, Some("1")))
            .unwrap();
        assert!(response.contact.emails.is_empty());
        assert!(response.contact.secondary_contact_ids.is_empty());
    }

    #[test]
    fn test_memory_backend() {
        let config = DatabaseConfig {
            backend: DatabaseBackend::Memory,
            ..DatabaseConfig::default()
        };
        let backend = initialize_backend(&config, false).unwrap();
        assert!(backend.ping().is_ok());
    }
}
