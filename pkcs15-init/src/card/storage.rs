//! Card image storage
//!
//! Persists a virtual card as a pretty-printed JSON file so a provisioned
//! image can be inspected or reloaded between runs.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log::{debug, info, warn};
use thiserror::Error;

use super::state::CardImage;

/// Errors while reading or writing a stored card image
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Malformed card image: {0}")]
    Json(#[from] serde_json::Error),
}

/// Handles persistent storage of a card image
pub struct CardImageStore {
    storage_dir: PathBuf,
    image_file: PathBuf,
    pub image: CardImage,
}

impl CardImageStore {
    const DEFAULT_IMAGE_FILE: &'static str = "card_image.json";

    /// Get the default storage directory
    fn default_storage_dir() -> PathBuf {
        if let Ok(path) = std::env::var("PKCS15_INIT_STORAGE_DIR") {
            return PathBuf::from(path);
        }
        if let Some(home) = dirs::home_dir() {
            return home.join(".pkcs15-init");
        }
        PathBuf::from("/var/lib/pkcs15-init")
    }

    /// Create a store rooted at `storage_path`, or at the default directory
    pub fn new(storage_path: Option<PathBuf>) -> Self {
        let storage_dir = storage_path.unwrap_or_else(Self::default_storage_dir);
        let image_file = storage_dir.join(Self::DEFAULT_IMAGE_FILE);

        Self {
            storage_dir,
            image_file,
            image: CardImage::default(),
        }
    }

    pub fn image_file(&self) -> &Path {
        &self.image_file
    }

    fn io_error(path: &Path, source: io::Error) -> StorageError {
        StorageError::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    fn ensure_storage_dir(&self) -> Result<(), StorageError> {
        fs::create_dir_all(&self.storage_dir).map_err(|e| Self::io_error(&self.storage_dir, e))?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let _ = fs::set_permissions(&self.storage_dir, fs::Permissions::from_mode(0o700));
        }
        Ok(())
    }

    /// Load the stored image
    ///
    /// Returns `Ok(false)` and a blank image when nothing is stored yet.
    pub fn load(&mut self) -> Result<bool, StorageError> {
        if !self.image_file.exists() {
            info!("No stored card image, starting blank");
            self.image = CardImage::default();
            return Ok(false);
        }

        let content =
            fs::read_to_string(&self.image_file).map_err(|e| Self::io_error(&self.image_file, e))?;
        match serde_json::from_str(&content) {
            Ok(image) => {
                self.image = image;
                info!("Loaded card image from {:?}", self.image_file);
                Ok(true)
            }
            Err(e) => {
                warn!("Failed to parse card image {:?}: {}", self.image_file, e);
                Err(e.into())
            }
        }
    }

    /// Save the current image
    pub fn save(&self) -> Result<(), StorageError> {
        self.ensure_storage_dir()?;

        let json = serde_json::to_string_pretty(&self.image)?;
        fs::write(&self.image_file, json).map_err(|e| Self::io_error(&self.image_file, e))?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let _ = fs::set_permissions(&self.image_file, fs::Permissions::from_mode(0o600));
        }
        debug!("Saved card image to {:?}", self.image_file);
        Ok(())
    }

    /// Replace the stored image with a blank card
    pub fn reset(&mut self) -> Result<(), StorageError> {
        self.image = CardImage::default();
        self.save()?;
        info!("Card image reset to blank");
        Ok(())
    }
}
