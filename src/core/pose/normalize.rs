//! 定稿时的图片规整
//!
//! 全部姿态共用一个边距裁剪矩形（同一视频源的黑边一致），
//! 然后逐个姿态处理：原始帧 裁剪 → 抠色 → 缩放 → 编码，骨架预览 裁剪 → 缩放 → 编码，
//! 人脸图只重新编码。单张图片失败只记录日志并保留原图。

use super::config::PoseSetConfig;
use super::item::PoseSetItem;
use crate::core::image::{EncodedImage, FitSize, ImageTrimError, ImageTrimmer, MarginTrim};
use log::{debug, info, warn};

pub(crate) fn normalize_poses(poses: &mut [PoseSetItem], config: &PoseSetConfig) {
    let trim = find_global_trim(poses, config);
    match &trim {
        Some(trim) => info!(
            "✂️ margin trim: top={}, bottom={}, height {} -> {}",
            trim.margin_top, trim.margin_bottom, trim.height_old, trim.height_new
        ),
        None => info!("✂️ margin trim: none"),
    }

    for pose in poses.iter_mut() {
        normalize_pose_images(pose, trim.as_ref(), config);
    }
}

/// 找到第一张边距颜色与配置一致的帧，计算其裁剪矩形
pub(crate) fn find_global_trim(poses: &[PoseSetItem], config: &PoseSetConfig) -> Option<MarginTrim> {
    for pose in poses {
        let Some(frame) = &pose.images.frame else {
            continue;
        };
        let trimmer = match ImageTrimmer::load_encoded(frame) {
            Ok(trimmer) => trimmer,
            Err(e) => {
                warn!("⚠️ t={}: frame decode failed: {}", pose.time_ms, e);
                continue;
            }
        };

        let Some(color) = trimmer.detect_margin_color() else {
            continue;
        };
        if !color.same_rgb(&config.margin_trimming_color) {
            debug!("t={}: margin color {} ignored", pose.time_ms, color);
            continue;
        }

        let (_, trim) = trimmer.trim_margin(
            &config.margin_trimming_color,
            config.margin_trimming_diff_threshold,
        );
        if trim.is_some() {
            return trim;
        }
    }

    None
}

fn normalize_pose_images(pose: &mut PoseSetItem, trim: Option<&MarginTrim>, config: &PoseSetConfig) {
    let time_ms = pose.time_ms;
    let images = &mut pose.images;

    replace_image(&mut images.frame, "frame", time_ms, |image| {
        let trimmer = load_trimmed(image, trim)?
            .replace_color(
                &config.background_replace_src_color,
                &config.background_replace_dst_color,
                config.background_replace_diff_threshold,
            )
            .resize_to_fit(FitSize::width(config.image_width));
        trimmer.encode(config.image_mime, Some(config.image_quality))
    });

    replace_image(&mut images.pose_preview, "pose preview", time_ms, |image| {
        let trimmer = load_trimmed(image, trim)?.resize_to_fit(FitSize::width(config.image_width));
        trimmer.encode(config.image_mime, Some(config.image_quality))
    });

    replace_image(&mut images.face_frame, "face frame", time_ms, |image| {
        ImageTrimmer::load_encoded(image)?.encode(config.image_mime, Some(config.image_quality))
    });
}

fn load_trimmed(image: &EncodedImage, trim: Option<&MarginTrim>) -> Result<ImageTrimmer, ImageTrimError> {
    let trimmer = ImageTrimmer::load_encoded(image)?;
    match trim {
        Some(trim) => trimmer.apply_trim(trim),
        None => Ok(trimmer),
    }
}

fn replace_image<F>(slot: &mut Option<EncodedImage>, label: &str, time_ms: i64, process: F)
where
    F: FnOnce(&EncodedImage) -> Result<EncodedImage, ImageTrimError>,
{
    let Some(image) = slot.as_ref() else {
        return;
    };
    match process(image) {
        Ok(processed) => *slot = Some(processed),
        Err(e) => warn!("⚠️ t={}: {} left unchanged: {}", time_ms, label, e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::image::{Color, ImageMime};
    use crate::core::pose::vector::tests::body_landmarks;
    use crate::core::pose::vector::BodyVector;
    use image::{Rgba, RgbaImage};

    fn item_with_frame(time_ms: i64, frame: EncodedImage) -> PoseSetItem {
        let body = BodyVector::from_landmarks(&body_landmarks(0.0, 0.0)).unwrap();
        let mut item = PoseSetItem::new(time_ms, body, None);
        item.images.frame = Some(frame);
        item
    }

    fn bordered_png(border: [u8; 4]) -> EncodedImage {
        let image = RgbaImage::from_fn(20, 20, |_, y| {
            if y < 3 {
                Rgba(border)
            } else {
                Rgba([120, 40, 40, 255])
            }
        });
        ImageTrimmer::from_rgba(image).encode(ImageMime::Png, None).unwrap()
    }

    #[test]
    fn test_find_global_trim_ignores_other_margin_colors() {
        let config = PoseSetConfig::lossless();
        let poses = vec![item_with_frame(0, bordered_png([255, 255, 255, 255]))];
        assert!(find_global_trim(&poses, &config).is_none());
    }

    #[test]
    fn test_find_global_trim_uses_first_match() {
        let config = PoseSetConfig::lossless();
        let poses = vec![
            item_with_frame(0, bordered_png([255, 255, 255, 255])),
            item_with_frame(100, bordered_png([0, 0, 0, 255])),
        ];
        let trim = find_global_trim(&poses, &config).unwrap();
        assert_eq!(trim.margin_top, 3);
        assert_eq!(trim.height_new, 17);
    }

    #[test]
    fn test_broken_image_left_unchanged() {
        let config = PoseSetConfig {
            margin_trimming_color: Color::rgb(1, 2, 3),
            ..PoseSetConfig::lossless()
        };
        let broken = EncodedImage::new(ImageMime::Png, vec![1, 2, 3, 4]);
        let mut poses = vec![item_with_frame(0, broken.clone())];

        normalize_poses(&mut poses, &config);
        assert_eq!(poses[0].images.frame, Some(broken));
    }

    #[test]
    fn test_face_frame_only_reencoded() {
        let config = PoseSetConfig {
            image_width: 4,
            ..PoseSetConfig::lossless()
        };
        let face = ImageTrimmer::from_rgba(RgbaImage::from_pixel(8, 8, Rgba([9, 9, 9, 255])))
            .encode(ImageMime::Png, None)
            .unwrap();
        let mut poses = vec![item_with_frame(0, bordered_png([0, 0, 0, 255]))];
        poses[0].images.face_frame = Some(face);

        normalize_poses(&mut poses, &config);

        let face = ImageTrimmer::load_encoded(poses[0].images.face_frame.as_ref().unwrap()).unwrap();
        assert_eq!((face.width(), face.height()), (8, 8));
        let frame = ImageTrimmer::load_encoded(poses[0].images.frame.as_ref().unwrap()).unwrap();
        assert_eq!(frame.width(), 4);
    }
}
