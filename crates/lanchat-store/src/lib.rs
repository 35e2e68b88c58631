//! # lanchat-store
//!
//! Local persisted state for the lanchat client: the user's display name and
//! the bounded image cache.
//!
//! [`Database`] keeps both in a small SQLite file; [`MemoryStore`] keeps them
//! in memory for tests and throwaway sessions. The chat session only sees the
//! [`LocalStore`] trait.

pub mod database;
pub mod memory;
pub mod migrations;
pub mod settings;

mod error;

pub use database::Database;
pub use error::{Result, StoreError};
pub use memory::MemoryStore;

use lanchat_shared::Attachment;

/// Settings key for the persisted display name.
pub const KEY_DISPLAY_NAME: &str = "chatName";
/// Settings key for the JSON-encoded image cache.
pub const KEY_IMAGE_CACHE: &str = "imageCache";

/// Persistence surface used by the chat session.
pub trait LocalStore {
    fn load_display_name(&self) -> Result<Option<String>>;
    fn save_display_name(&self, name: &str) -> Result<()>;
    /// Cached images, newest first.
    fn load_image_cache(&self) -> Result<Vec<Attachment>>;
    fn save_image_cache(&self, images: &[Attachment]) -> Result<()>;
}
