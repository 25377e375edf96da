use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use image::GrayImage;
use thiserror::Error;

const APP_DIR: &str = "labelpaint";
const IMAGES_SUBDIR: &str = "images";
const LABELS_SUBDIR: &str = "labels";
const RAW_LABELS_SUBDIR: &str = "raw-labels";
const MASK_EXTENSION: &str = "png";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("missing HOME environment variable")]
    MissingHomeDirectory,
    #[error("image name is empty or not a plain file name")]
    InvalidImageName,
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("image encoding error: {0}")]
    Image(#[from] image::ImageError),
}

pub type StorageResult<T> = std::result::Result<T, StorageError>;

/// Where source images come from and where painted masks go.
pub trait MaskStorage {
    fn load_source_image(&self, image_name: &str) -> StorageResult<Vec<u8>>;
    fn load_existing_mask(&self, image_name: &str) -> StorageResult<Option<Vec<u8>>>;
    fn save_mask(&self, image_name: &str, encoded_mask: &[u8]) -> StorageResult<PathBuf>;
    fn save_class_codes(&self, image_name: &str, codes: &GrayImage) -> StorageResult<PathBuf>;
}

/// Filesystem layout: `images/<name>`, `labels/<stem>.png`, `raw-labels/<stem>.png`.
#[derive(Debug, Clone)]
pub struct StorageService {
    data_root: PathBuf,
}

impl StorageService {
    pub fn with_root(data_root: PathBuf) -> Self {
        Self { data_root }
    }

    pub fn with_default_root() -> StorageResult<Self> {
        let root = match std::env::var_os("XDG_DATA_HOME").filter(|value| !value.is_empty()) {
            Some(xdg) => PathBuf::from(xdg),
            None => {
                let home = std::env::var_os("HOME").ok_or(StorageError::MissingHomeDirectory)?;
                PathBuf::from(home).join(".local").join("share")
            }
        };
        Ok(Self::with_root(root.join(APP_DIR)))
    }

    pub fn data_root(&self) -> &Path {
        &self.data_root
    }

    pub fn images_dir(&self) -> PathBuf {
        self.data_root.join(IMAGES_SUBDIR)
    }

    pub fn labels_dir(&self) -> PathBuf {
        self.data_root.join(LABELS_SUBDIR)
    }

    pub fn raw_labels_dir(&self) -> PathBuf {
        self.data_root.join(RAW_LABELS_SUBDIR)
    }

    pub fn source_path(&self, image_name: &str) -> StorageResult<PathBuf> {
        validate_image_name(image_name)?;
        Ok(self.images_dir().join(image_name))
    }

    pub fn mask_path(&self, image_name: &str) -> StorageResult<PathBuf> {
        Ok(self.labels_dir().join(mask_file_name(image_name)?))
    }

    pub fn class_codes_path(&self, image_name: &str) -> StorageResult<PathBuf> {
        Ok(self.raw_labels_dir().join(mask_file_name(image_name)?))
    }
}

impl MaskStorage for StorageService {
    fn load_source_image(&self, image_name: &str) -> StorageResult<Vec<u8>> {
        let path = self.source_path(image_name)?;
        Ok(fs::read(path)?)
    }

    fn load_existing_mask(&self, image_name: &str) -> StorageResult<Option<Vec<u8>>> {
        let path = self.mask_path(image_name)?;
        match fs::read(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(StorageError::Io(err)),
        }
    }

    fn save_mask(&self, image_name: &str, encoded_mask: &[u8]) -> StorageResult<PathBuf> {
        let path = self.mask_path(image_name)?;
        write_replacing(&path, encoded_mask)?;
        tracing::info!(path = %path.display(), bytes = encoded_mask.len(), "saved mask");
        Ok(path)
    }

    fn save_class_codes(&self, image_name: &str, codes: &GrayImage) -> StorageResult<PathBuf> {
        let path = self.class_codes_path(image_name)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        codes.save_with_format(&path, image::ImageFormat::Png)?;
        tracing::info!(path = %path.display(), "saved class-code mask");
        Ok(path)
    }
}

fn validate_image_name(image_name: &str) -> StorageResult<()> {
    let path = Path::new(image_name);
    let is_plain = path.file_name().and_then(|name| name.to_str()) == Some(image_name);
    if image_name.is_empty() || !is_plain {
        return Err(StorageError::InvalidImageName);
    }
    Ok(())
}

fn mask_file_name(image_name: &str) -> StorageResult<String> {
    validate_image_name(image_name)?;
    let stem = Path::new(image_name)
        .file_stem()
        .and_then(|stem| stem.to_str())
        .ok_or(StorageError::InvalidImageName)?;
    Ok(format!("{stem}.{MASK_EXTENSION}"))
}

/// Writes through a sibling temp file so a failed write never truncates the old mask.
fn write_replacing(destination: &Path, bytes: &[u8]) -> StorageResult<()> {
    if let Some(parent) = destination.parent() {
        fs::create_dir_all(parent)?;
    }

    let mut staging = destination.as_os_str().to_owned();
    staging.push(".partial");
    let staging = PathBuf::from(staging);

    fs::write(&staging, bytes)?;
    if let Err(err) = fs::rename(&staging, destination) {
        let _ = fs::remove_file(&staging);
        return Err(StorageError::Io(err));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    fn scratch_root(name: &str) -> PathBuf {
        let root = std::env::temp_dir().join(format!(
            "labelpaint-storage-{name}-{}",
            std::process::id()
        ));
        let _ = fs::remove_dir_all(&root);
        root
    }

    #[test]
    fn mask_paths_use_image_stem() {
        let service = StorageService::with_root(PathBuf::from("/data"));
        assert_eq!(
            service.mask_path("leaf_01.jpg").unwrap(),
            PathBuf::from("/data/labels/leaf_01.png")
        );
        assert_eq!(
            service.class_codes_path("leaf_01.jpg").unwrap(),
            PathBuf::from("/data/raw-labels/leaf_01.png")
        );
        assert_eq!(
            service.source_path("leaf_01.jpg").unwrap(),
            PathBuf::from("/data/images/leaf_01.jpg")
        );
    }

    #[test]
    fn image_names_must_be_plain_file_names() {
        let service = StorageService::with_root(PathBuf::from("/data"));
        for name in ["", "../escape.png", "nested/leaf.png", "/abs.png"] {
            assert!(
                matches!(service.mask_path(name), Err(StorageError::InvalidImageName)),
                "{name:?} should be rejected"
            );
        }
    }

    #[test]
    fn missing_mask_loads_as_none() {
        let service = StorageService::with_root(scratch_root("missing"));
        assert!(service
            .load_existing_mask("leaf.jpg")
            .expect("missing mask is not an error")
            .is_none());
    }

    #[test]
    fn save_mask_overwrites_and_reloads() {
        let root = scratch_root("save");
        let service = StorageService::with_root(root.clone());

        service.save_mask("leaf.jpg", b"first").expect("first save");
        let path = service.save_mask("leaf.jpg", b"second").expect("second save");

        assert_eq!(path, root.join("labels/leaf.png"));
        assert_eq!(
            service.load_existing_mask("leaf.jpg").expect("load mask"),
            Some(b"second".to_vec())
        );
        assert!(!root.join("labels/leaf.png.partial").exists());

        let _ = fs::remove_dir_all(&root);
    }

    #[test]
    fn class_codes_are_written_as_grayscale_png() {
        let root = scratch_root("codes");
        let service = StorageService::with_root(root.clone());
        let mut codes = GrayImage::new(3, 2);
        codes.put_pixel(1, 1, Luma([2]));

        let path = service
            .save_class_codes("leaf.jpg", &codes)
            .expect("save codes");
        let reloaded = image::open(&path).expect("reopen codes").to_luma8();
        assert_eq!(reloaded, codes);

        let _ = fs::remove_dir_all(&root);
    }
}
