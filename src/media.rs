use std::fs;
use std::path::Path;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::error::{Error, Result};

pub const UPLOAD_DIR: &str = "posts_images";

/// An image attached to a post form as base64.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ImageUpload {
    pub filename: String,
    pub base64: String,
}

/// Decodes and verifies `upload`, writes it under `media_root` and returns the
/// URL the post should store.
pub fn save_post_image(media_root: &Path, upload: &ImageUpload) -> Result<String> {
    let data = STANDARD.decode(upload.base64.trim()).map_err(|e| {
        error!("image {} is not valid base64: {:?}", upload.filename, e);
        Error::invalid("image", "invalid_base64")
    })?;

    let format = image::guess_format(&data).map_err(|_| Error::invalid("image", "invalid_image"))?;
    if let Err(e) = image::load_from_memory_with_format(&data, format) {
        error!("image {} failed to decode: {:?}", upload.filename, e);
        return Err(Error::invalid("image", "invalid_image"));
    }
    let extension = format
        .extensions_str()
        .first()
        .copied()
        .unwrap_or("img");

    let folder = media_root.join(UPLOAD_DIR);
    fs::create_dir_all(&folder)?;
    let file_name = format!("{}.{}", Uuid::new_v4().simple(), extension);
    fs::write(folder.join(&file_name), &data)?;

    let url = format!("/media/{}/{}", UPLOAD_DIR, file_name);
    info!("image {} saved in: {}", upload.filename, &url);
    Ok(url)
}

/// Removes a file previously returned by [`save_post_image`]. URLs outside the
/// upload folder are left alone, and a file that is already gone is not an error.
pub fn remove_post_image(media_root: &Path, url: &str) -> Result<()> {
    let prefix = format!("/media/{}/", UPLOAD_DIR);
    let Some(file_name) = url.strip_prefix(&prefix) else {
        warn!("not removing {}: outside {}", url, UPLOAD_DIR);
        return Ok(());
    };
    if file_name.is_empty() || file_name.contains('/') || file_name.contains("..") {
        warn!("not removing {}: bad file name", url);
        return Ok(());
    }
    match fs::remove_file(media_root.join(UPLOAD_DIR).join(file_name)) {
        Ok(()) => {
            info!("image removed: {}", url);
            Ok(())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

/// Drops `previous` once it is no longer the image in use.
pub fn discard_unused(media_root: &Path, previous: Option<&str>, current: Option<&str>) {
    if let Some(url) = previous.filter(|url| Some(*url) != current) {
        if let Err(e) = remove_post_image(media_root, url) {
            error!("could not remove image {}: {:?}", url, e);
        }
    }
}
