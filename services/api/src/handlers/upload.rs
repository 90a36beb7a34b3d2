use axum::extract::multipart::MultipartRejection;
use axum::extract::{Multipart, State};
use axum::response::IntoResponse;
use serde::Serialize;

use linetime_auth_types::identity::CurrentUser;
use linetime_core::response::ApiResponse;

use crate::domain::types::UploadedImage;
use crate::error::ApiError;
use crate::infra::storage::S3Storage;
use crate::state::AppState;
use crate::usecase::upload::{UploadFile, UploadImageUseCase, UploadImagesUseCase};

#[derive(Serialize)]
pub struct UploadedImageResponse {
    pub image_url: String,
    pub thumbnail_url: String,
    pub size: u64,
    pub width: u32,
    pub height: u32,
}

impl From<UploadedImage> for UploadedImageResponse {
    fn from(image: UploadedImage) -> Self {
        Self {
            image_url: image.image_url,
            thumbnail_url: image.thumbnail_url,
            size: image.size,
            width: image.width,
            height: image.height,
        }
    }
}

/// Collect every part named `field`; other parts are drained and ignored.
async fn read_files(multipart: &mut Multipart, field: &str) -> Result<Vec<UploadFile>, ApiError> {
    let mut files = Vec::new();
    while let Some(part) = multipart.next_field().await? {
        if part.name() != Some(field) {
            continue;
        }
        let file_name = part.file_name().unwrap_or_default().to_owned();
        let bytes = part.bytes().await?;
        files.push(UploadFile {
            file_name,
            bytes: bytes.to_vec(),
        });
    }
    Ok(files)
}

fn single_usecase(state: &AppState) -> UploadImageUseCase<S3Storage> {
    UploadImageUseCase {
        storage: state.storage.clone(),
        settings: state.upload.clone(),
    }
}

// ── POST /api/upload/image ────────────────────────────────────────────────────

pub async fn upload_image(
    State(state): State<AppState>,
    _current: CurrentUser,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let mut multipart = multipart?;
    let file = read_files(&mut multipart, "image")
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| ApiError::validation("请选择要上传的图片"))?;

    let image = single_usecase(&state).execute(file).await?;
    Ok(ApiResponse::ok(UploadedImageResponse::from(image)))
}

// ── POST /api/upload/images ───────────────────────────────────────────────────

pub async fn upload_images(
    State(state): State<AppState>,
    _current: CurrentUser,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let mut multipart = multipart?;
    let files = read_files(&mut multipart, "images").await?;

    let usecase = UploadImagesUseCase {
        single: single_usecase(&state),
    };
    let images = usecase.execute(files).await?;
    let body: Vec<UploadedImageResponse> =
        images.into_iter().map(UploadedImageResponse::from).collect();
    Ok(ApiResponse::ok(body))
}
