//! Profile image storage on local disk
//!
//! Images are fetched from a caller-supplied URL, checked to be JPEG, and
//! written under the media directory, which the router serves at `/static`.
//! The crop box is validated against the image dimensions and stored next
//! to the image; pixels are kept as fetched.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::config::{MediaConfig, ServerConfig};
use crate::data::UserId;
use crate::error::AppError;

/// Region of the image to display, in pixels, end-exclusive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CropBox {
    pub x_start: i64,
    pub y_start: i64,
    pub x_end: i64,
    pub y_end: i64,
}

/// Media storage service
pub struct MediaStore {
    client: reqwest::Client,
    /// Directory served at `/static`
    directory: PathBuf,
    /// e.g. "http://localhost:8080"
    public_url: String,
    max_bytes: usize,
}

impl MediaStore {
    pub fn new(media: &MediaConfig, server: &ServerConfig) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("dreams/", env!("CARGO_PKG_VERSION")))
            .timeout(std::time::Duration::from_secs(10))
            .build()?;

        Ok(Self {
            client,
            directory: media.directory.clone(),
            public_url: server.base_url().to_string(),
            max_bytes: media.max_bytes,
        })
    }

    /// Fetch, validate and store a user's profile image
    ///
    /// # Returns
    /// Public URL of the stored image
    pub async fn store_profile_image(
        &self,
        user_id: UserId,
        url: &str,
        crop: CropBox,
    ) -> Result<String, AppError> {
        let response = self.client.get(url).send().await?;
        if response.status() != reqwest::StatusCode::OK {
            return Err(AppError::validation(format!(
                "img_url returned HTTP status {}",
                response.status().as_u16()
            )));
        }

        let bytes = read_limited(response, self.max_bytes).await?;

        let (width, height) = jpeg_dimensions(&bytes)
            .ok_or_else(|| AppError::validation("Image uploaded is not a JPG"))?;
        validate_crop(crop, width, height)?;

        tokio::fs::create_dir_all(&self.directory).await?;
        let file_name = format!("{}_profile.jpg", user_id);
        tokio::fs::write(self.directory.join(&file_name), &bytes).await?;

        let sidecar = serde_json::to_vec(&crop).map_err(|e| AppError::Internal(e.into()))?;
        tokio::fs::write(
            self.directory.join(format!("{}_profile.crop.json", user_id)),
            sidecar,
        )
        .await?;

        tracing::info!(
            user_id = %user_id,
            width,
            height,
            size = bytes.len(),
            "Profile image stored"
        );
        Ok(format!("{}/static/{}", self.public_url, file_name))
    }
}

/// Read the body, giving up as soon as it is known to exceed `max_bytes`
async fn read_limited(
    mut response: reqwest::Response,
    max_bytes: usize,
) -> Result<Vec<u8>, AppError> {
    let too_large = || AppError::validation(format!("Image is larger than {} bytes", max_bytes));

    let declared = response.content_length();
    if declared.is_some_and(|length| length > max_bytes as u64) {
        return Err(too_large());
    }

    let mut bytes = Vec::with_capacity(declared.map_or(0, |length| length as usize));
    while let Some(chunk) = response.chunk().await? {
        if bytes.len() + chunk.len() > max_bytes {
            return Err(too_large());
        }
        bytes.extend_from_slice(&chunk);
    }
    Ok(bytes)
}

/// Width and height from the first SOF segment, or `None` if not a JPEG
pub fn jpeg_dimensions(bytes: &[u8]) -> Option<(u32, u32)> {
    if !bytes.starts_with(&[0xFF, 0xD8]) {
        return None;
    }

    let mut i = 2;
    loop {
        if *bytes.get(i)? != 0xFF {
            return None;
        }
        let marker = *bytes.get(i + 1)?;
        match marker {
            // Fill byte
            0xFF => {
                i += 1;
                continue;
            }
            // Standalone markers
            0x01 | 0xD0..=0xD7 => {
                i += 2;
                continue;
            }
            // Start of scan or end of image before any frame header
            0xDA | 0xD9 => return None,
            _ => {}
        }

        let length = u16::from_be_bytes([*bytes.get(i + 2)?, *bytes.get(i + 3)?]) as usize;
        let is_frame = matches!(marker, 0xC0..=0xCF) && !matches!(marker, 0xC4 | 0xC8 | 0xCC);
        if is_frame {
            let height = u16::from_be_bytes([*bytes.get(i + 5)?, *bytes.get(i + 6)?]);
            let width = u16::from_be_bytes([*bytes.get(i + 7)?, *bytes.get(i + 8)?]);
            return Some((u32::from(width), u32::from(height)));
        }
        if length < 2 {
            return None;
        }
        i += 2 + length;
    }
}

/// The crop box must be non-empty and lie inside the image
pub fn validate_crop(crop: CropBox, width: u32, height: u32) -> Result<(), AppError> {
    let (width, height) = (i64::from(width), i64::from(height));
    if crop.x_start < 0 || crop.y_start < 0 || crop.x_end > width || crop.y_end > height {
        return Err(AppError::validation(format!(
            "Crop box is not within the image dimensions ({width}x{height})"
        )));
    }
    if crop.x_end <= crop.x_start || crop.y_end <= crop.y_start {
        return Err(AppError::validation("Crop end must be after crop start"));
    }
    Ok(())
}
