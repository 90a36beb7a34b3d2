use std::io::Cursor;

use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use linetime_api::error::ApiError;
use linetime_api::usecase::upload::{
    UploadFile, UploadImageUseCase, UploadImagesUseCase, UploadSettings,
};

use crate::helpers::MockStorage;

fn encoded(width: u32, height: u32, format: ImageFormat) -> Vec<u8> {
    let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb([200, 120, 40])));
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), format).unwrap();
    buf
}

fn settings() -> UploadSettings {
    UploadSettings {
        max_file_size: 1024 * 1024,
        allowed_types: UploadSettings::parse_allowed_types("jpg,jpeg,png,gif,webp"),
        max_files: 3,
    }
}

fn single(storage: &MockStorage) -> UploadImageUseCase<MockStorage> {
    UploadImageUseCase {
        storage: storage.clone(),
        settings: settings(),
    }
}

fn file(name: &str, bytes: Vec<u8>) -> UploadFile {
    UploadFile {
        file_name: name.to_owned(),
        bytes,
    }
}

#[tokio::test]
async fn should_store_original_and_png_thumbnail() {
    let storage = MockStorage::new();
    let bytes = encoded(800, 600, ImageFormat::Png);
    let size = bytes.len() as u64;

    let uploaded = single(&storage)
        .execute(file("Photo.PNG", bytes))
        .await
        .unwrap();

    assert_eq!((uploaded.width, uploaded.height), (800, 600));
    assert_eq!(uploaded.size, size);

    let keys = storage.keys();
    assert_eq!(keys.len(), 2);
    assert!(keys[0].starts_with("images/original/") && keys[0].ends_with(".png"));
    assert!(keys[1].starts_with("images/thumbnails/") && keys[1].ends_with(".png"));
    assert_eq!(uploaded.image_url, format!("https://cdn.test/{}", keys[0]));
    assert_eq!(uploaded.thumbnail_url, format!("https://cdn.test/{}", keys[1]));

    let objects = storage.objects.lock().unwrap();
    assert_eq!(objects[0].content_type, "image/png");
    assert_eq!(objects[0].size as u64, size);
}

#[tokio::test]
async fn should_encode_jpeg_thumbnail_for_non_png() {
    let storage = MockStorage::new();
    single(&storage)
        .execute(file("cat.jpeg", encoded(500, 500, ImageFormat::Jpeg)))
        .await
        .unwrap();

    let objects = storage.objects.lock().unwrap();
    assert!(objects[0].key.ends_with(".jpeg"));
    assert!(objects[1].key.ends_with(".jpg"));
    assert_eq!(objects[1].content_type, "image/jpeg");
}

#[tokio::test]
async fn should_reject_before_touching_storage() {
    let storage = MockStorage::new();
    let uc = single(&storage);

    let empty = uc.execute(file("a.png", Vec::new())).await;
    assert!(
        matches!(&empty, Err(ApiError::Validation(msg)) if msg == "请选择要上传的图片"),
        "expected Validation, got {empty:?}"
    );

    let too_big = uc.execute(file("a.png", vec![0; 1024 * 1024 + 1])).await;
    assert!(
        matches!(&too_big, Err(ApiError::Validation(msg)) if msg == "文件大小超过限制（最大 1 MB）"),
        "expected Validation, got {too_big:?}"
    );

    let wrong_type = uc
        .execute(file("notes.pdf", encoded(10, 10, ImageFormat::Png)))
        .await;
    assert!(
        matches!(&wrong_type, Err(ApiError::Validation(msg)) if msg.starts_with("不支持的文件类型")),
        "expected Validation, got {wrong_type:?}"
    );

    let garbage = uc.execute(file("a.png", b"not an image".to_vec())).await;
    assert!(
        matches!(&garbage, Err(ApiError::Validation(msg)) if msg == "解码图片失败"),
        "expected Validation, got {garbage:?}"
    );

    assert!(storage.keys().is_empty());
}

#[tokio::test]
async fn should_upload_batch_in_order() {
    let storage = MockStorage::new();
    let uc = UploadImagesUseCase {
        single: single(&storage),
    };

    let uploaded = uc
        .execute(vec![
            file("one.png", encoded(20, 10, ImageFormat::Png)),
            file("two.png", encoded(30, 10, ImageFormat::Png)),
        ])
        .await
        .unwrap();

    let widths: Vec<u32> = uploaded.iter().map(|u| u.width).collect();
    assert_eq!(widths, vec![20, 30]);
    assert_eq!(storage.keys().len(), 4);
}

#[tokio::test]
async fn should_enforce_batch_limits() {
    let storage = MockStorage::new();
    let uc = UploadImagesUseCase {
        single: single(&storage),
    };

    let none = uc.execute(Vec::new()).await;
    assert!(
        matches!(none, Err(ApiError::Validation(_))),
        "expected Validation, got {none:?}"
    );

    let files = (0..4)
        .map(|i| file(&format!("{i}.png"), encoded(8, 8, ImageFormat::Png)))
        .collect();
    let too_many = uc.execute(files).await;
    assert!(
        matches!(&too_many, Err(ApiError::Validation(msg)) if msg == "单次最多上传 3 张图片"),
        "expected Validation, got {too_many:?}"
    );
    assert!(storage.keys().is_empty());
}
