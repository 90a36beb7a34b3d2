use std::io::Cursor;

use anyhow::Context;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat};
use uuid::Uuid;

use crate::domain::repository::ObjectStorage;
use crate::domain::types::{THUMBNAIL_JPEG_QUALITY, THUMBNAIL_WIDTH, UploadedImage};
use crate::domain::validation::file_extension;
use crate::error::ApiError;

#[derive(Debug, Clone)]
pub struct UploadSettings {
    pub max_file_size: u64,
    /// Lowercase extensions without the dot.
    pub allowed_types: Vec<String>,
    pub max_files: usize,
}

impl UploadSettings {
    /// Parses a comma-separated allow-list such as `"jpg,jpeg,png"`.
    pub fn parse_allowed_types(raw: &str) -> Vec<String> {
        raw.split(',')
            .map(|t| t.trim().trim_start_matches('.').to_ascii_lowercase())
            .filter(|t| !t.is_empty())
            .collect()
    }

    fn is_allowed(&self, ext: &str) -> bool {
        self.allowed_types.iter().any(|t| t == ext)
    }
}

pub struct UploadFile {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

struct Processed {
    width: u32,
    height: u32,
    thumbnail: Vec<u8>,
    thumbnail_ext: &'static str,
}

fn content_type_for(ext: &str) -> &'static str {
    match ext {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        _ => "application/octet-stream",
    }
}

/// Scale to [`THUMBNAIL_WIDTH`] keeping the aspect ratio; narrower images keep their size.
fn thumbnail_of(img: &DynamicImage) -> DynamicImage {
    let (width, height) = (img.width(), img.height());
    if width <= THUMBNAIL_WIDTH {
        return img.clone();
    }
    let scaled_height = ((u64::from(height) * u64::from(THUMBNAIL_WIDTH)) / u64::from(width))
        .max(1) as u32;
    img.resize_exact(THUMBNAIL_WIDTH, scaled_height, FilterType::Lanczos3)
}

fn process(bytes: &[u8]) -> Result<Processed, ApiError> {
    let img = image::load_from_memory(bytes).map_err(|_| ApiError::validation("解码图片失败"))?;
    let format = image::guess_format(bytes).ok();
    let thumb = thumbnail_of(&img);

    let mut buf = Vec::new();
    let thumbnail_ext = if format == Some(ImageFormat::Png) {
        thumb
            .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
            .context("encode png thumbnail")?;
        "png"
    } else {
        let encoder = JpegEncoder::new_with_quality(&mut buf, THUMBNAIL_JPEG_QUALITY);
        DynamicImage::ImageRgb8(thumb.to_rgb8())
            .write_with_encoder(encoder)
            .context("encode jpeg thumbnail")?;
        "jpg"
    };

    Ok(Processed {
        width: img.width(),
        height: img.height(),
        thumbnail: buf,
        thumbnail_ext,
    })
}

// ── UploadImage ──────────────────────────────────────────────────────────────

pub struct UploadImageUseCase<O: ObjectStorage> {
    pub storage: O,
    pub settings: UploadSettings,
}

impl<O: ObjectStorage> UploadImageUseCase<O> {
    pub async fn execute(&self, file: UploadFile) -> Result<UploadedImage, ApiError> {
        let size = file.bytes.len() as u64;
        if size == 0 {
            return Err(ApiError::validation("请选择要上传的图片"));
        }
        if size > self.settings.max_file_size {
            return Err(ApiError::validation(format!(
                "文件大小超过限制（最大 {} MB）",
                self.settings.max_file_size / 1024 / 1024
            )));
        }

        let ext = file_extension(&file.file_name)
            .filter(|ext| self.settings.is_allowed(ext))
            .ok_or_else(|| {
                ApiError::validation(format!(
                    "不支持的文件类型，仅支持: {}",
                    self.settings.allowed_types.join(",")
                ))
            })?;

        let bytes = file.bytes;
        let (bytes, processed) = tokio::task::spawn_blocking(move || {
            let processed = process(&bytes);
            (bytes, processed)
        })
        .await
        .context("image processing task")?;
        let processed = processed?;

        let id = Uuid::new_v4();
        let original_key = format!("images/original/{id}.{ext}");
        let image_url = self
            .storage
            .put(&original_key, bytes, content_type_for(&ext))
            .await?;

        // A failure here leaves the original object behind.
        let thumbnail_key = format!("images/thumbnails/{id}.{}", processed.thumbnail_ext);
        let thumbnail_url = self
            .storage
            .put(
                &thumbnail_key,
                processed.thumbnail,
                content_type_for(processed.thumbnail_ext),
            )
            .await?;

        tracing::info!(key = %original_key, size, "image uploaded");

        Ok(UploadedImage {
            image_url,
            thumbnail_url,
            size,
            width: processed.width,
            height: processed.height,
        })
    }
}

// ── UploadImages ─────────────────────────────────────────────────────────────

pub struct UploadImagesUseCase<O: ObjectStorage> {
    pub single: UploadImageUseCase<O>,
}

impl<O: ObjectStorage> UploadImagesUseCase<O> {
    /// Uploads sequentially; the first failure aborts the batch.
    pub async fn execute(&self, files: Vec<UploadFile>) -> Result<Vec<UploadedImage>, ApiError> {
        if files.is_empty() {
            return Err(ApiError::validation("请选择要上传的图片"));
        }
        let max = self.single.settings.max_files;
        if files.len() > max {
            return Err(ApiError::validation(format!("单次最多上传 {max} 张图片")));
        }

        let mut results = Vec::with_capacity(files.len());
        for file in files {
            results.push(self.single.execute(file).await?);
        }
        Ok(results)
    }
}
