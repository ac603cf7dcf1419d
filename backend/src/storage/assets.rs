//! # Asset Store
//!
//! Uploaded attachments (bill PDFs, receipt images) stored by exact
//! filename under the data directory's `assets/` subdirectory. Saving under
//! an existing name overwrites; names are validated so a lookup can never
//! resolve outside the assets directory.

use std::fs;
use std::path::PathBuf;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum AssetError {
    #[error("asset not found: {0}")]
    NotFound(String),
    #[error("invalid asset name: {0}")]
    InvalidName(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Content type for a filename, derived from its extension. Unrecognized
/// extensions fall back to a generic binary type.
pub fn content_type(name: &str) -> &'static str {
    let extension = name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match extension.as_str() {
        "pdf" => "application/pdf",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        _ => "application/octet-stream",
    }
}

#[derive(Clone)]
pub struct AssetStore {
    dir: PathBuf,
}

impl AssetStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Validate a caller-chosen filename and resolve it inside the assets
    /// directory. Separators and parent references are rejected outright.
    fn resolve(&self, name: &str) -> Result<PathBuf, AssetError> {
        if name.is_empty()
            || name.contains('/')
            || name.contains('\\')
            || name.contains("..")
        {
            return Err(AssetError::InvalidName(name.to_string()));
        }
        Ok(self.dir.join(name))
    }

    /// Persist bytes under the given name, replacing prior content.
    pub fn save(&self, name: &str, bytes: &[u8]) -> Result<(), AssetError> {
        let path = self.resolve(name)?;
        fs::create_dir_all(&self.dir)?;
        fs::write(&path, bytes)?;
        info!("saved asset {} ({} bytes)", name, bytes.len());
        Ok(())
    }

    /// Retrieve an asset's bytes together with its derived content type.
    pub fn load(&self, name: &str) -> Result<(Vec<u8>, &'static str), AssetError> {
        let path = self.resolve(name)?;
        if !path.is_file() {
            return Err(AssetError::NotFound(name.to_string()));
        }
        let bytes = fs::read(&path)?;
        Ok((bytes, content_type(name)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn setup_store() -> (AssetStore, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let store = AssetStore::new(temp_dir.path().join("assets"));
        (store, temp_dir)
    }

    #[test]
    fn save_then_load_round_trips_bytes_and_content_type() {
        let (store, _temp_dir) = setup_store();

        store.save("foo.pdf", b"%PDF-1.4 fake").unwrap();
        let (bytes, mime) = store.load("foo.pdf").unwrap();

        assert_eq!(bytes, b"%PDF-1.4 fake");
        assert_eq!(mime, "application/pdf");
    }

    #[test]
    fn save_overwrites_existing_content() {
        let (store, _temp_dir) = setup_store();

        store.save("boleto.png", b"old").unwrap();
        store.save("boleto.png", b"new").unwrap();

        let (bytes, mime) = store.load("boleto.png").unwrap();
        assert_eq!(bytes, b"new");
        assert_eq!(mime, "image/png");
    }

    #[test]
    fn missing_asset_is_not_found() {
        let (store, _temp_dir) = setup_store();

        match store.load("missing.pdf") {
            Err(AssetError::NotFound(name)) => assert_eq!(name, "missing.pdf"),
            other => panic!("expected not-found, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn names_cannot_escape_the_assets_directory() {
        let (store, _temp_dir) = setup_store();

        for name in ["../escape.pdf", "a/b.pdf", "..", "", "nested\\evil.pdf"] {
            assert!(matches!(
                store.load(name),
                Err(AssetError::InvalidName(_))
            ));
            assert!(matches!(
                store.save(name, b"x"),
                Err(AssetError::InvalidName(_))
            ));
        }
    }

    #[test]
    fn unrecognized_extension_falls_back_to_octet_stream() {
        assert_eq!(content_type("notas.txt"), "application/octet-stream");
        assert_eq!(content_type("semextensao"), "application/octet-stream");
        assert_eq!(content_type("FOTO.JPG"), "image/jpeg");
        assert_eq!(content_type("anim.webp"), "image/webp");
        assert_eq!(content_type("anim.gif"), "image/gif");
    }
}
