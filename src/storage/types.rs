//! Types for object storage

use std::path::Path;

use uuid::Uuid;

use crate::error::Error;

/// Which kind of podcast asset a file is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetKind {
    Audio,
    Image,
}

impl AssetKind {
    /// Path prefix of the asset kind inside the bucket
    pub fn prefix(&self) -> &'static str {
        match self {
            AssetKind::Audio => "podcasts/audio",
            AssetKind::Image => "podcasts/images",
        }
    }

    /// A fresh storage path for a file of this kind, such as
    /// `podcasts/images/<uuid>-<filename>`.
    ///
    /// Every call gives a new path, so two podcasts never share a blob.
    pub fn path_for(&self, upload: &Upload) -> String {
        format!("{}/{}-{}", self.prefix(), Uuid::new_v4(), upload.file_name)
    }
}

/// A file picked for upload
#[derive(Debug, Clone, PartialEq)]
pub struct Upload {
    /// File name without directories
    pub file_name: String,

    /// MIME type, when known
    pub content_type: Option<String>,

    /// File contents
    pub bytes: Vec<u8>,
}

impl Upload {
    /// Create an upload from in-memory bytes
    pub fn new(file_name: &str, bytes: Vec<u8>) -> Self {
        let file_name = Path::new(file_name)
            .file_name()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "file".to_string());
        Self {
            content_type: guess_content_type(&file_name).map(str::to_string),
            file_name,
            bytes,
        }
    }

    /// Read a file from disk
    pub async fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path).await?;
        let name = path
            .file_name()
            .map(|s| s.to_string_lossy().to_string())
            .ok_or_else(|| Error::validation(format!("{} is not a file", path.display())))?;
        Ok(Self::new(&name, bytes))
    }
}

fn guess_content_type(file_name: &str) -> Option<&'static str> {
    let ext = Path::new(file_name).extension()?.to_str()?.to_ascii_lowercase();
    Some(match ext.as_str() {
        "mp3" => "audio/mpeg",
        "mp4" => "video/mp4",
        "m4a" => "audio/mp4",
        "wav" => "audio/wav",
        "ogg" => "audio/ogg",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn asset_paths() {
        let audio = Upload::new("episode-1.mp3", vec![1, 2, 3]);
        let path = AssetKind::Audio.path_for(&audio);
        assert!(path.starts_with("podcasts/audio/"));
        assert!(path.ends_with("-episode-1.mp3"));
        assert_eq!(audio.content_type.as_deref(), Some("audio/mpeg"));

        let image = Upload::new("/tmp/covers/cover.PNG", vec![]);
        assert_eq!(image.file_name, "cover.PNG");
        let path = AssetKind::Image.path_for(&image);
        assert!(path.starts_with("podcasts/images/"));
        assert!(path.ends_with("-cover.PNG"));
        assert_eq!(image.content_type.as_deref(), Some("image/png"));
    }

    #[test]
    fn same_file_name_gets_distinct_paths() {
        let cover = Upload::new("cover.png", vec![]);
        assert_ne!(AssetKind::Image.path_for(&cover), AssetKind::Image.path_for(&cover));
    }
}
