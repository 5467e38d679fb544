use log::{ debug, error };
use std::io::ErrorKind;
use std::path::{ Component, Path, PathBuf };
use std::time::SystemTime;
use thiserror::Error;
use tokio::fs;

/// Lower-case extensions (without dot) that count as photos.
pub const IMAGE_EXTENSIONS: [&str; 5] = ["jpg", "jpeg", "png", "webp", "gif"];

#[derive(Debug, Error)]
pub enum PhotoError {
    #[error("failed to read '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

struct PhotoEntry {
    name: String,
    modified: SystemTime,
}

pub fn is_image(file_name: &str) -> bool {
    Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.iter().any(|allowed| ext.eq_ignore_ascii_case(allowed)))
        .unwrap_or(false)
}

#[derive(Debug, Clone)]
pub struct PhotoLister {
    root: PathBuf,
}

impl PhotoLister {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Maps a category to its directory. Only a single plain path component
    /// is accepted so a category can never point outside the assets root.
    pub fn category_dir(&self, category: &str) -> Option<PathBuf> {
        let mut components = Path::new(category).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(name)), None) => Some(self.root.join(name)),
            _ => None,
        }
    }

    /// File names of the photos in `category`, oldest modification first.
    /// A category without a directory has no photos.
    pub async fn list(&self, category: &str) -> Result<Vec<String>, PhotoError> {
        let Some(dir) = self.category_dir(category) else {
            debug!("Rejected photo category {:?}", category);
            return Ok(Vec::new());
        };

        match fs::metadata(&dir).await {
            Ok(meta) if meta.is_dir() => {}
            Ok(_) => {
                return Ok(Vec::new());
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("No photo directory at {}", dir.display());
                return Ok(Vec::new());
            }
            Err(e) => {
                return Err(io_error(&dir, e));
            }
        }

        let mut entries = fs::read_dir(&dir).await.map_err(|e| io_error(&dir, e))?;
        let mut photos = Vec::new();

        while let Some(entry) = entries.next_entry().await.map_err(|e| io_error(&dir, e))? {
            let name = match entry.file_name().into_string() {
                Ok(name) => name,
                Err(raw) => {
                    debug!("Skipping non UTF-8 file name {:?} in {}", raw, dir.display());
                    continue;
                }
            };
            if !is_image(&name) {
                continue;
            }

            let path = entry.path();
            let meta = fs::metadata(&path).await.map_err(|e| io_error(&path, e))?;
            if !meta.is_file() {
                continue;
            }
            let modified = meta.modified().map_err(|e| io_error(&path, e))?;
            photos.push(PhotoEntry { name, modified });
        }

        photos.sort_by(|a, b| a.modified.cmp(&b.modified).then_with(|| a.name.cmp(&b.name)));
        debug!("Category {}: {} photos", category, photos.len());

        Ok(photos.into_iter().map(|p| p.name).collect())
    }
}

fn io_error(path: &Path, source: std::io::Error) -> PhotoError {
    error!("Photo listing failed on {}: {}", path.display(), source);
    PhotoError::Io { path: path.to_path_buf(), source }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn image_extensions_are_case_insensitive() {
        assert!(is_image("a.JPG"));
        assert!(is_image("b.jpeg"));
        assert!(is_image("c.WebP"));
        assert!(is_image("d.gif"));
        assert!(!is_image("notes.txt"));
        assert!(!is_image("png"));
        assert!(!is_image(".png"));
        assert!(!is_image("archive.png.zip"));
    }

    #[test]
    fn category_must_be_single_component() {
        let lister = PhotoLister::new("/srv/assets");
        assert_eq!(lister.category_dir("voyage"), Some(PathBuf::from("/srv/assets/voyage")));
        assert_eq!(lister.category_dir(".."), None);
        assert_eq!(lister.category_dir("../etc"), None);
        assert_eq!(lister.category_dir("a/b"), None);
        assert_eq!(lister.category_dir("/etc"), None);
        assert_eq!(lister.category_dir(""), None);
        assert_eq!(lister.category_dir("."), None);
    }

    #[tokio::test]
    async fn file_in_place_of_directory_has_no_photos() {
        let root = tempfile::tempdir().unwrap();
        std::fs::write(root.path().join("voyage"), b"not a dir").unwrap();

        let lister = PhotoLister::new(root.path());
        assert!(lister.list("voyage").await.unwrap().is_empty());
    }
}
