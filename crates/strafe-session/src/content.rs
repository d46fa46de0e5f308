//! Map, content-distribution and gamemode seams.

use std::path::PathBuf;

/// A piece of distributed content fetched to a local directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentItem {
    /// Numeric content id.
    pub id: u64,
    /// Local directory holding the downloaded files.
    pub directory: PathBuf,
}

/// Errors surfaced by a [`ContentProvider`].
#[derive(Debug, thiserror::Error)]
pub enum ContentError {
    /// No content source knows this map.
    #[error("map not found: {0}")]
    MapNotFound(String),

    /// The map exists but failed to load.
    #[error("map {name} failed to load: {reason}")]
    MapLoadFailed {
        /// Map name.
        name: String,
        /// Provider-specific reason.
        reason: String,
    },

    /// A downloaded item could not be registered as a content source.
    #[error("invalid content source {}", .0.display())]
    InvalidSource(PathBuf),

    /// Filesystem error while touching content.
    #[error("content I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Resolves map names to loaded map data, fetching distributed content when
/// needed.
#[allow(async_fn_in_trait)]
pub trait ContentProvider {
    /// Name of the map currently loaded, if any.
    fn current_map(&self) -> Option<String>;

    /// Load a map by name.
    async fn load_map(&self, name: &str) -> Result<(), ContentError>;

    /// Whether the content-distribution service can be used right now.
    fn distribution_available(&self) -> bool;

    /// Look up a distributed item by id.
    async fn resolve_item(&self, id: u64) -> Option<ContentItem>;

    /// Download a distributed item. Returns `false` on failure.
    async fn download_item(&self, id: u64) -> bool;

    /// Register a downloaded item's directory as a local content source.
    fn add_local_source(&self, item: &ContentItem) -> Result<(), ContentError>;

    /// Forget content downloaded for a previous session.
    fn clear_downloads(&self) {}
}

/// Loads gamemodes by name.
pub trait GamemodeLoader {
    /// Load `name`. Returns `false` if the gamemode is unknown or failed.
    fn load_gamemode(&mut self, name: &str) -> bool;

    /// Name of the loaded gamemode.
    fn current_gamemode(&self) -> Option<String>;

    /// Unload the current gamemode, if any.
    fn unload(&mut self);
}
