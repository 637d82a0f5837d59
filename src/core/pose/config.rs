use super::error::Result;
use super::similarity::{DEFAULT_BODY_THRESHOLD, DEFAULT_HAND_THRESHOLD};
use crate::core::image::{Color, ImageMime};
use serde::Deserialize;
use std::path::Path;

/// 姿态集配置
///
/// 可从 JSON5 文本加载，未给出的字段使用默认值。
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PoseSetConfig {
    pub body_similarity_threshold: f64,
    pub hand_similarity_threshold: f64,
    /// 整体去重时的手部阈值
    pub dedup_hand_similarity_threshold: f64,
    /// 队列清空时只保留代表姿态
    pub collapse_similar_poses: bool,
    pub remove_duplicates_on_finalize: bool,

    pub image_width: u32,
    pub image_mime: ImageMime,
    /// 0.0 ~ 1.0，仅有损格式有效
    pub image_quality: f32,

    pub margin_trimming_color: Color,
    pub margin_trimming_diff_threshold: u32,
    pub background_replace_src_color: Color,
    pub background_replace_dst_color: Color,
    pub background_replace_diff_threshold: u32,
}

impl Default for PoseSetConfig {
    fn default() -> Self {
        Self {
            body_similarity_threshold: DEFAULT_BODY_THRESHOLD,
            hand_similarity_threshold: DEFAULT_HAND_THRESHOLD,
            dedup_hand_similarity_threshold: 0.9,
            collapse_similar_poses: true,
            remove_duplicates_on_finalize: true,
            image_width: 1080,
            image_mime: ImageMime::Webp,
            image_quality: 0.8,
            margin_trimming_color: Color::BLACK,
            margin_trimming_diff_threshold: 50,
            background_replace_src_color: Color::rgb(0x01, 0x6a, 0xfd),
            background_replace_dst_color: Color::rgba(0xff, 0xff, 0xff, 0x00),
            background_replace_diff_threshold: 130,
        }
    }
}

impl PoseSetConfig {
    /// 保留所有原始帧，用于排查相似度问题
    pub fn diagnostic() -> Self {
        Self {
            collapse_similar_poses: false,
            remove_duplicates_on_finalize: false,
            ..Self::default()
        }
    }

    pub fn lossless() -> Self {
        Self {
            image_mime: ImageMime::Png,
            image_quality: 1.0,
            ..Self::default()
        }
    }

    pub fn from_json5(text: &str) -> Result<Self> {
        Ok(json5::from_str(text)?)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json5(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_values() {
        let config = PoseSetConfig::default();
        assert_eq!(config.body_similarity_threshold, 0.8);
        assert_eq!(config.hand_similarity_threshold, 0.75);
        assert_eq!(config.image_mime, ImageMime::Webp);
        assert_eq!(config.background_replace_src_color.to_hex(), "#016afd");
        assert_eq!(config.background_replace_dst_color.a, Some(0));
    }

    #[test]
    fn test_from_json5_partial() {
        let config = PoseSetConfig::from_json5(
            r#"{
                // 只覆盖部分字段
                imageWidth: 720,
                imageMime: 'image/jpeg',
                marginTrimmingColor: '#101010',
                collapseSimilarPoses: false,
            }"#,
        )
        .unwrap();

        assert_eq!(config.image_width, 720);
        assert_eq!(config.image_mime, ImageMime::Jpeg);
        assert_eq!(config.margin_trimming_color, Color::rgb(0x10, 0x10, 0x10));
        assert!(!config.collapse_similar_poses);
        assert_eq!(config.background_replace_diff_threshold, 130);
    }

    #[test]
    fn test_from_json5_invalid_color() {
        assert!(PoseSetConfig::from_json5("{ marginTrimmingColor: 'black' }").is_err());
    }

    #[test]
    fn test_presets() {
        assert!(!PoseSetConfig::diagnostic().collapse_similar_poses);
        assert!(!PoseSetConfig::diagnostic().remove_duplicates_on_finalize);
        assert_eq!(PoseSetConfig::lossless().image_mime, ImageMime::Png);
    }

    #[test]
    fn test_load_missing_file() {
        assert!(PoseSetConfig::load("/nonexistent/pose-config.json5").is_err());
    }
}
