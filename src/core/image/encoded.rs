use super::error::ImageTrimError;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

const DATA_URL_PATTERN: &str = r"^data:(image/[a-zA-Z0-9.+-]+);base64,(.*)$";

/// 导出图片格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ImageMime {
    #[serde(rename = "image/png")]
    Png,
    #[serde(rename = "image/jpeg")]
    Jpeg,
    #[default]
    #[serde(rename = "image/webp")]
    Webp,
}

impl ImageMime {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImageMime::Png => "image/png",
            ImageMime::Jpeg => "image/jpeg",
            ImageMime::Webp => "image/webp",
        }
    }

    /// 归档内文件扩展名
    pub fn extension(&self) -> &'static str {
        match self {
            ImageMime::Png => "png",
            ImageMime::Jpeg => "jpg",
            ImageMime::Webp => "webp",
        }
    }

    pub fn from_mime(mime: &str) -> Option<Self> {
        match mime.to_ascii_lowercase().as_str() {
            "image/png" => Some(ImageMime::Png),
            "image/jpeg" | "image/jpg" => Some(ImageMime::Jpeg),
            "image/webp" => Some(ImageMime::Webp),
            _ => None,
        }
    }

    /// 只有有损格式才使用 quality 参数
    pub fn is_lossy(&self) -> bool {
        matches!(self, ImageMime::Jpeg | ImageMime::Webp)
    }
}

impl fmt::Display for ImageMime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 已编码图片（PNG / JPEG / WebP 字节）
#[derive(Clone, PartialEq, Eq)]
pub struct EncodedImage {
    pub mime: ImageMime,
    pub data: Vec<u8>,
}

impl EncodedImage {
    pub fn new(mime: ImageMime, data: Vec<u8>) -> Self {
        Self { mime, data }
    }

    /// 解析 `data:image/...;base64,...`
    pub fn from_data_url(url: &str) -> Result<Self, ImageTrimError> {
        let regex = Regex::new(DATA_URL_PATTERN).map_err(|_| ImageTrimError::InvalidDataUrl)?;
        let caps = regex.captures(url.trim()).ok_or(ImageTrimError::InvalidDataUrl)?;

        let mime = ImageMime::from_mime(&caps[1])
            .ok_or_else(|| ImageTrimError::UnsupportedMime(caps[1].to_string()))?;
        let data = STANDARD.decode(&caps[2])?;

        Ok(Self { mime, data })
    }

    pub fn to_data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime, STANDARD.encode(&self.data))
    }
}

impl fmt::Debug for EncodedImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncodedImage")
            .field("mime", &self.mime)
            .field("bytes", &self.data.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_url_roundtrip() {
        let image = EncodedImage::new(ImageMime::Png, vec![0x89, b'P', b'N', b'G', 1, 2, 3]);
        let url = image.to_data_url();
        assert!(url.starts_with("data:image/png;base64,"));
        assert_eq!(EncodedImage::from_data_url(&url).unwrap(), image);
    }

    #[test]
    fn test_data_url_rejects_garbage() {
        assert!(matches!(
            EncodedImage::from_data_url("not a data url"),
            Err(ImageTrimError::InvalidDataUrl)
        ));
        assert!(matches!(
            EncodedImage::from_data_url("data:image/gif;base64,AAAA"),
            Err(ImageTrimError::UnsupportedMime(_))
        ));
    }

    #[test]
    fn test_mime_extension() {
        assert_eq!(ImageMime::Jpeg.extension(), "jpg");
        assert_eq!(ImageMime::Webp.extension(), "webp");
        assert_eq!(ImageMime::from_mime("IMAGE/PNG"), Some(ImageMime::Png));
        assert!(ImageMime::Jpeg.is_lossy());
        assert!(ImageMime::Webp.is_lossy());
        assert!(!ImageMime::Png.is_lossy());
    }
}
