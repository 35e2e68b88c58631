//! Database connection management.
//!
//! The [`Database`] struct owns a [`rusqlite::Connection`] and guarantees that
//! migrations are run before any other operation.

use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use rusqlite::Connection;

use lanchat_shared::Attachment;

use crate::error::{Result, StoreError};
use crate::migrations;
use crate::{LocalStore, KEY_DISPLAY_NAME, KEY_IMAGE_CACHE};

/// Wrapper around a [`rusqlite::Connection`].
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open (or create) the default application database.
    ///
    /// The database file is placed in the platform-appropriate data directory:
    /// - Linux:   `~/.local/share/lanchat/lanchat.db`
    /// - macOS:   `~/Library/Application Support/org.lanchat.lanchat/lanchat.db`
    /// - Windows: `{FOLDERID_RoamingAppData}\lanchat\lanchat\data\lanchat.db`
    pub fn new() -> Result<Self> {
        let project_dirs =
            ProjectDirs::from("org", "lanchat", "lanchat").ok_or(StoreError::NoDataDir)?;
        Self::open_in(project_dirs.data_dir())
    }

    /// Open (or create) `lanchat.db` inside `data_dir`, creating the directory.
    pub fn open_in(data_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(data_dir)?;
        let db_path = data_dir.join("lanchat.db");

        tracing::info!(path = %db_path.display(), "opening database");

        Self::open_at(&db_path)
    }

    /// Open (or create) a database at an explicit path.
    pub fn open_at(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;

        conn.pragma_update(None, "journal_mode", "WAL")?;

        migrations::run_migrations(&conn)?;

        Ok(Self { conn })
    }

    /// Return a reference to the underlying `rusqlite::Connection`.
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Return the filesystem path of the open database (if any).
    pub fn path(&self) -> Option<PathBuf> {
        self.conn.path().map(PathBuf::from)
    }
}

impl LocalStore for Database {
    fn load_display_name(&self) -> Result<Option<String>> {
        self.get_setting(KEY_DISPLAY_NAME)
    }

    fn save_display_name(&self, name: &str) -> Result<()> {
        self.set_setting(KEY_DISPLAY_NAME, name)
    }

    fn load_image_cache(&self) -> Result<Vec<Attachment>> {
        match self.get_setting(KEY_IMAGE_CACHE)? {
            Some(json) => Ok(serde_json::from_str(&json)?),
            None => Ok(Vec::new()),
        }
    }

    fn save_image_cache(&self, images: &[Attachment]) -> Result<()> {
        let json = serde_json::to_string(images)?;
        self.set_setting(KEY_IMAGE_CACHE, &json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_db() -> (tempfile::TempDir, Database) {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open_in(dir.path()).expect("should open");
        (dir, db)
    }

    #[test]
    fn open_creates_file() {
        let (dir, db) = temp_db();
        assert_eq!(db.path().unwrap(), dir.path().join("lanchat.db"));
    }

    #[test]
    fn display_name_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let db = Database::open_in(dir.path()).unwrap();
            assert_eq!(db.load_display_name().unwrap(), None);
            db.save_display_name("Alice").unwrap();
        }
        let db = Database::open_in(dir.path()).unwrap();
        assert_eq!(db.load_display_name().unwrap().as_deref(), Some("Alice"));
    }

    #[test]
    fn image_cache_round_trip() {
        let (_dir, db) = temp_db();
        assert!(db.load_image_cache().unwrap().is_empty());

        let images = vec![
            Attachment::from_bytes("b.png", "image/png", b"second").unwrap(),
            Attachment::from_bytes("a.png", "image/png", b"first").unwrap(),
        ];
        db.save_image_cache(&images).unwrap();
        assert_eq!(db.load_image_cache().unwrap(), images);
    }

    #[test]
    fn corrupt_image_cache_reported() {
        let (_dir, db) = temp_db();
        db.set_setting(KEY_IMAGE_CACHE, "{not json").unwrap();
        assert!(matches!(db.load_image_cache(), Err(StoreError::Corrupt(_))));
    }
}
