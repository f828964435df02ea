//! App Core for Shelfmark.
//!
//! Central struct holding the database and settings for the lifetime of the process.

use std::sync::Arc;

use crate::database::connection::Database;
use crate::services::settings_engine::{SettingsEngine, SettingsEngineTrait};
use crate::types::settings::AppSettings;

/// Central application struct.
///
/// Managers borrow the connection with a lifetime parameter, so they are
/// created on demand: `CollectionManager::new(app.db.connection())`.
pub struct App {
    pub db: Arc<Database>,
    pub settings_engine: SettingsEngine,
}

impl App {
    /// Creates a new App with default settings and a database at `db_path`.
    pub fn new(db_path: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let mut settings = AppSettings::default();
        settings.database.path = Some(db_path.to_string());
        let settings_engine = SettingsEngine::with_settings(
            crate::platform::get_config_dir()
                .join("settings.json")
                .to_string_lossy()
                .to_string(),
            settings,
        );
        Self::from_settings(settings_engine)
    }

    /// Creates an App from an already loaded settings engine, opening the configured database.
    pub fn from_settings(settings_engine: SettingsEngine) -> Result<Self, Box<dyn std::error::Error>> {
        let db_path = settings_engine.database_path();
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let db = Database::open_with_settings(&db_path, &settings_engine.get_settings().database)?;
        tracing::info!("database ready at {}", db_path.display());

        Ok(Self {
            db: Arc::new(db),
            settings_engine,
        })
    }

    pub fn settings(&self) -> &AppSettings {
        self.settings_engine.get_settings()
    }
}
