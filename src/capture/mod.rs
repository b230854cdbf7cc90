//! 图像采集模块
//!
//! 读取用户选择的图片文件，嗅探格式、解码尺寸，
//! 并生成用于传输的 base64 编码（不带 data-URL 前缀）。

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use std::fs;
use std::path::Path;
use thiserror::Error;
use tracing::debug;

/// 图像采集错误
#[derive(Debug, Error)]
pub enum CaptureError {
    /// 文件读取失败
    #[error("failed to read image file: {0}")]
    Unreadable(#[from] std::io::Error),
    /// 内容不是已知的图片格式
    #[error("file is not a supported image")]
    NotAnImage,
    /// 图片解码失败
    #[error("failed to decode image: {0}")]
    Decode(#[from] image::ImageError),
}

/// 当前会话中的图片
///
/// 持有原始字节、嗅探出的 MIME 类型、像素尺寸（预览信息）
/// 以及传输用的 base64 编码。仅存在于内存中，不做持久化。
#[derive(Debug, Clone)]
pub struct CapturedImage {
    bytes: Vec<u8>,
    mime_type: &'static str,
    width: u32,
    height: u32,
    base64: String,
}

impl CapturedImage {
    /// 从文件路径读取图片
    pub fn from_path(path: &Path) -> Result<Self, CaptureError> {
        let bytes = fs::read(path)?;
        Self::from_bytes(bytes)
    }

    /// 从内存字节构造图片
    ///
    /// 先嗅探格式再编码，非图片内容在任何编码或网络动作之前被拒绝。
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, CaptureError> {
        let format = image::guess_format(&bytes).map_err(|_| CaptureError::NotAnImage)?;
        let decoded = image::load_from_memory_with_format(&bytes, format)?;
        let (width, height) = (decoded.width(), decoded.height());
        let base64 = BASE64.encode(&bytes);

        debug!(
            "Captured image: {} {}x{} ({} bytes)",
            format.to_mime_type(),
            width,
            height,
            bytes.len()
        );

        Ok(Self {
            bytes,
            mime_type: format.to_mime_type(),
            width,
            height,
            base64,
        })
    }

    /// 原始字节
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// 文件大小（字节）
    pub fn size_bytes(&self) -> usize {
        self.bytes.len()
    }

    /// MIME 类型（如 image/png）
    pub fn mime_type(&self) -> &'static str {
        self.mime_type
    }

    /// 像素宽度
    pub fn width(&self) -> u32 {
        self.width
    }

    /// 像素高度
    pub fn height(&self) -> u32 {
        self.height
    }

    /// base64 编码内容
    pub fn base64(&self) -> &str {
        &self.base64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn png_fixture() -> Vec<u8> {
        let img = image::RgbImage::from_pixel(3, 2, image::Rgb([200, 30, 30]));
        let mut buf = std::io::Cursor::new(Vec::new());
        image::DynamicImage::ImageRgb8(img)
            .write_to(&mut buf, image::ImageFormat::Png)
            .unwrap();
        buf.into_inner()
    }

    fn jpeg_fixture() -> Vec<u8> {
        let img = image::RgbImage::from_pixel(4, 4, image::Rgb([10, 120, 10]));
        let mut buf = std::io::Cursor::new(Vec::new());
        image::DynamicImage::ImageRgb8(img)
            .write_to(&mut buf, image::ImageFormat::Jpeg)
            .unwrap();
        buf.into_inner()
    }

    #[test]
    fn test_capture_png() {
        let bytes = png_fixture();
        let captured = CapturedImage::from_bytes(bytes.clone()).unwrap();

        assert_eq!(captured.mime_type(), "image/png");
        assert_eq!((captured.width(), captured.height()), (3, 2));
        assert_eq!(captured.size_bytes(), bytes.len());
    }

    #[test]
    fn test_capture_jpeg_mime() {
        let captured = CapturedImage::from_bytes(jpeg_fixture()).unwrap();
        assert_eq!(captured.mime_type(), "image/jpeg");
    }

    #[test]
    fn test_base64_round_trip() {
        let bytes = png_fixture();
        let captured = CapturedImage::from_bytes(bytes.clone()).unwrap();

        let decoded = BASE64.decode(captured.base64()).unwrap();
        assert_eq!(decoded, bytes);
    }

    #[test]
    fn test_rejects_non_image() {
        let err = CapturedImage::from_bytes(b"definitely not an image".to_vec()).unwrap_err();
        assert!(matches!(err, CaptureError::NotAnImage));
    }

    #[test]
    fn test_from_path() {
        let path = std::env::temp_dir().join(format!("dipole-capture-{}.png", std::process::id()));
        fs::write(&path, png_fixture()).unwrap();

        let captured = CapturedImage::from_path(&path).unwrap();
        assert_eq!(captured.mime_type(), "image/png");

        fs::remove_file(&path).ok();
    }

    #[test]
    fn test_missing_file_is_unreadable() {
        let err = CapturedImage::from_path(Path::new("/nonexistent/antenna.png")).unwrap_err();
        assert!(matches!(err, CaptureError::Unreadable(_)));
    }
}
