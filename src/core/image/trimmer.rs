//! 单张图片的整形处理器：边距检测、裁剪、抠色、缩放、编码
//!
//! 每个变换都消费旧的像素缓冲并产出新的缓冲（所有权转移），
//! 旧缓冲随 `self` 一起释放，不会被其他地方引用。

use super::color::Color;
use super::encoded::{EncodedImage, ImageMime};
use super::error::ImageTrimError;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::imageops::{self, FilterType};
use image::{ExtendedColorType, ImageEncoder, RgbaImage};
use log::debug;
use rayon::prelude::*;
use std::ops::Range;

/// 边距检测搜索带：仅检查左侧 20% 宽度
const MARGIN_SEARCH_BAND_RATIO: f32 = 0.2;
/// 未指定 quality 时的 JPEG 质量
const DEFAULT_JPEG_QUALITY: f32 = 92.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeSide {
    Top,
    Bottom,
}

/// 裁剪边距的结果，可复用到同源的其它图片上
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarginTrim {
    /// 顶部边距高度（= 第一行内容的 y）
    pub margin_top: u32,
    /// 底部边距高度
    pub margin_bottom: u32,
    pub height_old: u32,
    pub height_new: u32,
    pub width: u32,
}

/// 缩放约束，只缩小不放大
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FitSize {
    pub width: Option<u32>,
    pub height: Option<u32>,
}

impl FitSize {
    pub fn width(width: u32) -> Self {
        Self {
            width: Some(width),
            height: None,
        }
    }

    pub fn height(height: u32) -> Self {
        Self {
            width: None,
            height: Some(height),
        }
    }
}

pub struct ImageTrimmer {
    buffer: RgbaImage,
}

impl ImageTrimmer {
    pub fn from_rgba(buffer: RgbaImage) -> Self {
        Self { buffer }
    }

    /// 从编码后的字节（PNG / JPEG / WebP / BMP）解码
    pub fn load(bytes: &[u8]) -> Result<Self, ImageTrimError> {
        let decoded = image::load_from_memory(bytes).map_err(ImageTrimError::Decode)?;
        Ok(Self {
            buffer: decoded.to_rgba8(),
        })
    }

    pub fn load_encoded(image: &EncodedImage) -> Result<Self, ImageTrimError> {
        Self::load(&image.data)
    }

    pub fn load_data_url(url: &str) -> Result<Self, ImageTrimError> {
        let image = EncodedImage::from_data_url(url)?;
        Self::load(&image.data)
    }

    pub fn width(&self) -> u32 {
        self.buffer.width()
    }

    pub fn height(&self) -> u32 {
        self.buffer.height()
    }

    pub fn buffer(&self) -> &RgbaImage {
        &self.buffer
    }

    pub fn into_buffer(self) -> RgbaImage {
        self.buffer
    }

    /// 检测左上角起始的纯色边距
    ///
    /// 从 x=0 开始按列扫描，记录 (0,0) 的颜色；遇到第一个不同颜色的像素时返回该起始颜色。
    /// 整张图只有一种颜色（或为空）时返回 `None`。
    pub fn detect_margin_color(&self) -> Option<Color> {
        let (w, h) = self.buffer.dimensions();
        if w == 0 || h == 0 {
            return None;
        }

        let leading = Color::from_pixel(&self.buffer.get_pixel(0, 0).0);
        for x in 0..w {
            for y in 0..h {
                let px = self.buffer.get_pixel(x, y).0;
                if !leading.same_rgb(&Color::from_pixel(&px)) {
                    return Some(leading);
                }
            }
        }

        None
    }

    /// 从指定一端逐行扫描，返回第一条非边距行的 y
    ///
    /// `Top` 返回值即顶部边距高度；`Bottom` 返回最后一行内容（含）。
    /// 整个区域都匹配边距颜色时返回 `None`。
    pub fn detect_edge(
        &self,
        color: &Color,
        side: EdgeSide,
        diff_threshold: u32,
        x_range: Range<u32>,
    ) -> Option<u32> {
        let (w, h) = self.buffer.dimensions();
        let xs = x_range.start.min(w)..x_range.end.min(w);
        if xs.is_empty() || h == 0 {
            return None;
        }

        let is_margin_row = |y: u32| {
            xs.clone().all(|x| {
                let px = self.buffer.get_pixel(x, y).0;
                color.diff_rgb(px[0], px[1], px[2]) <= diff_threshold
            })
        };

        match side {
            EdgeSide::Top => (0..h).find(|&y| !is_margin_row(y)),
            EdgeSide::Bottom => (0..h).rev().find(|&y| !is_margin_row(y)),
        }
    }

    /// 裁掉上下边距（水平黑边）
    ///
    /// 搜索区域限定在左侧 20% 宽度。找不到内容行时不裁剪并返回 `None`。
    pub fn trim_margin(self, color: &Color, diff_threshold: u32) -> (Self, Option<MarginTrim>) {
        let (w, h) = self.buffer.dimensions();
        let band_end = ((w as f32 * MARGIN_SEARCH_BAND_RATIO) as u32).max(1);
        let band = 0..band_end;

        let top = self.detect_edge(color, EdgeSide::Top, diff_threshold, band.clone());
        let bottom = self.detect_edge(color, EdgeSide::Bottom, diff_threshold, band);
        let (Some(top), Some(bottom)) = (top, bottom) else {
            debug!("✂️ trim_margin: no content rows found for {}", color);
            return (self, None);
        };

        let trim = MarginTrim {
            margin_top: top,
            margin_bottom: h - 1 - bottom,
            height_old: h,
            height_new: bottom - top + 1,
            width: w,
        };
        debug!(
            "✂️ trim_margin: top={}, bottom={}, {} -> {}",
            trim.margin_top, trim.margin_bottom, trim.height_old, trim.height_new
        );

        if trim.height_new == h {
            return (self, Some(trim));
        }

        match self.crop_buffer(0, trim.margin_top, trim.width, trim.height_new) {
            Some(buffer) => (Self { buffer }, Some(trim)),
            None => (self, None),
        }
    }

    /// 把已有的边距裁剪结果应用到当前图片
    pub fn apply_trim(self, trim: &MarginTrim) -> Result<Self, ImageTrimError> {
        self.crop(0, trim.margin_top, trim.width, trim.height_new)
    }

    /// 矩形裁剪，超出边界的部分会被截断
    pub fn crop(self, x: u32, y: u32, width: u32, height: u32) -> Result<Self, ImageTrimError> {
        let buffer = self
            .crop_buffer(x, y, width, height)
            .ok_or(ImageTrimError::EmptyCrop {
                x,
                y,
                width,
                height,
            })?;
        Ok(Self { buffer })
    }

    fn crop_buffer(&self, x: u32, y: u32, width: u32, height: u32) -> Option<RgbaImage> {
        let (w, h) = self.buffer.dimensions();
        let x_end = x.saturating_add(width).min(w);
        let y_end = y.saturating_add(height).min(h);
        if x >= x_end || y >= y_end {
            return None;
        }

        Some(imageops::crop_imm(&self.buffer, x, y, x_end - x, y_end - y).to_image())
    }

    /// 全图抠色：与 `src` 的差值不超过阈值的像素替换为 `dst`
    ///
    /// `dst` 带 alpha 时同时写入 alpha（用于抠成透明）。
    pub fn replace_color(self, src: &Color, dst: &Color, diff_threshold: u32) -> Self {
        let mut buffer = self.buffer;
        let pixels: &mut [u8] = &mut buffer;

        let replaced: usize = pixels
            .par_chunks_exact_mut(4)
            .map(|px| {
                if src.diff_rgb(px[0], px[1], px[2]) > diff_threshold {
                    return 0;
                }
                px[0] = dst.r;
                px[1] = dst.g;
                px[2] = dst.b;
                if let Some(a) = dst.a {
                    px[3] = a;
                }
                1
            })
            .sum();

        debug!("🎨 replace_color {} -> {}: {} pixels", src, dst, replaced);
        Self { buffer }
    }

    /// 等比缩小到约束尺寸以内；已经足够小时原样返回
    pub fn resize_to_fit(self, fit: FitSize) -> Self {
        let (w, h) = self.buffer.dimensions();
        if w == 0 || h == 0 {
            return self;
        }

        let (new_w, new_h) = match (fit.width, fit.height) {
            (Some(tw), _) if w > tw => {
                let tw = tw.max(1);
                (tw, Self::scale_len(h, tw, w))
            }
            (_, Some(th)) if h > th => {
                let th = th.max(1);
                (Self::scale_len(w, th, h), th)
            }
            _ => return self,
        };

        debug!("📐 resize_to_fit: {}x{} -> {}x{}", w, h, new_w, new_h);
        let buffer = imageops::resize(&self.buffer, new_w, new_h, FilterType::Triangle);
        Self { buffer }
    }

    fn scale_len(len: u32, num: u32, den: u32) -> u32 {
        ((len as f64 * num as f64 / den as f64).round() as u32).max(1)
    }

    fn to_rgb(&self) -> Vec<u8> {
        let len = self.width() as usize * self.height() as usize * 3;
        let mut rgb = Vec::with_capacity(len);
        for chunk in self.buffer.as_raw().chunks_exact(4) {
            rgb.push(chunk[0]);
            rgb.push(chunk[1]);
            rgb.push(chunk[2]);
        }
        rgb
    }

    /// 0.0-1.0 映射为编码器使用的 1-100
    fn quality_percent(quality: f32) -> f32 {
        (quality.clamp(0.0, 1.0) * 100.0).max(1.0)
    }

    /// 编码当前缓冲
    ///
    /// `quality`（0.0-1.0）只对有损格式生效：JPEG 缺省为 92；
    /// WebP 给出 quality 时有损编码，否则无损编码。
    pub fn encode(&self, mime: ImageMime, quality: Option<f32>) -> Result<EncodedImage, ImageTrimError> {
        let (w, h) = self.buffer.dimensions();
        let quality = quality
            .filter(|_| mime.is_lossy())
            .map(Self::quality_percent);
        let mut data = Vec::new();

        match mime {
            ImageMime::Png => PngEncoder::new(&mut data)
                .write_image(self.buffer.as_raw(), w, h, ExtendedColorType::Rgba8)
                .map_err(ImageTrimError::Encode)?,
            ImageMime::Jpeg => {
                let quality = quality.unwrap_or(DEFAULT_JPEG_QUALITY).round() as u8;
                JpegEncoder::new_with_quality(&mut data, quality)
                    .write_image(&self.to_rgb(), w, h, ExtendedColorType::Rgb8)
                    .map_err(ImageTrimError::Encode)?
            }
            ImageMime::Webp => {
                let encoder = webp::Encoder::from_rgba(self.buffer.as_raw(), w, h);
                let encoded = match quality {
                    Some(quality) => encoder.encode_simple(false, quality),
                    None => encoder.encode_simple(true, 100.0),
                }
                .map_err(|e| ImageTrimError::WebpEncode(format!("{:?}", e)))?;
                data.extend_from_slice(&encoded);
            }
        }

        Ok(EncodedImage::new(mime, data))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    const RED: Rgba<u8> = Rgba([200, 30, 30, 255]);
    const BLUE: Rgba<u8> = Rgba([1, 106, 253, 255]);
    const BLACK: Rgba<u8> = Rgba([0, 0, 0, 255]);

    /// 上下带黑边的测试图
    fn letterboxed(width: u32, height: u32, top: u32, bottom: u32) -> RgbaImage {
        RgbaImage::from_fn(width, height, |_, y| {
            if y < top || y >= height - bottom {
                BLACK
            } else {
                RED
            }
        })
    }

    #[test]
    fn test_detect_margin_color() {
        let trimmer = ImageTrimmer::from_rgba(letterboxed(40, 30, 6, 4));
        assert_eq!(trimmer.detect_margin_color(), Some(Color::BLACK));

        let uniform = ImageTrimmer::from_rgba(RgbaImage::from_pixel(10, 10, RED));
        assert_eq!(uniform.detect_margin_color(), None);
    }

    #[test]
    fn test_detect_edge() {
        let trimmer = ImageTrimmer::from_rgba(letterboxed(40, 30, 6, 4));
        assert_eq!(
            trimmer.detect_edge(&Color::BLACK, EdgeSide::Top, 10, 0..8),
            Some(6)
        );
        assert_eq!(
            trimmer.detect_edge(&Color::BLACK, EdgeSide::Bottom, 10, 0..8),
            Some(25)
        );

        let black = ImageTrimmer::from_rgba(RgbaImage::from_pixel(10, 10, BLACK));
        assert_eq!(black.detect_edge(&Color::BLACK, EdgeSide::Top, 0, 0..10), None);
    }

    #[test]
    fn test_trim_margin() {
        let trimmer = ImageTrimmer::from_rgba(letterboxed(40, 30, 6, 4));
        let (trimmed, trim) = trimmer.trim_margin(&Color::BLACK, 50);
        let trim = trim.unwrap();

        assert_eq!(trim.margin_top, 6);
        assert_eq!(trim.margin_bottom, 4);
        assert_eq!(trim.height_old, 30);
        assert_eq!(trim.height_new, 30 - 6 - 4);
        assert_eq!(trim.width, 40);
        assert_eq!(trimmed.height(), 20);
        assert_eq!(trimmed.width(), 40);
        assert_eq!(*trimmed.buffer().get_pixel(0, 0), RED);
    }

    #[test]
    fn test_trim_margin_only_checks_left_band() {
        // 右侧 80% 的内容不影响边距判定
        let mut img = letterboxed(50, 30, 5, 5);
        for x in 20..50 {
            img.put_pixel(x, 0, RED);
        }
        let (_, trim) = ImageTrimmer::from_rgba(img).trim_margin(&Color::BLACK, 50);
        assert_eq!(trim.unwrap().margin_top, 5);
    }

    #[test]
    fn test_apply_trim_to_sibling() {
        let (_, trim) = ImageTrimmer::from_rgba(letterboxed(40, 30, 6, 4)).trim_margin(&Color::BLACK, 50);
        let sibling = ImageTrimmer::from_rgba(RgbaImage::from_pixel(40, 30, BLUE));
        let cropped = sibling.apply_trim(&trim.unwrap()).unwrap();
        assert_eq!((cropped.width(), cropped.height()), (40, 20));
    }

    #[test]
    fn test_crop_clamps_and_rejects_empty() {
        let trimmer = ImageTrimmer::from_rgba(RgbaImage::from_pixel(10, 10, RED));
        let cropped = trimmer.crop(5, 5, 100, 100).unwrap();
        assert_eq!((cropped.width(), cropped.height()), (5, 5));

        let trimmer = ImageTrimmer::from_rgba(RgbaImage::from_pixel(10, 10, RED));
        assert!(matches!(
            trimmer.crop(10, 0, 5, 5),
            Err(ImageTrimError::EmptyCrop { .. })
        ));
    }

    #[test]
    fn test_replace_color_to_transparent() {
        let img = RgbaImage::from_fn(10, 10, |x, _| if x < 5 { BLUE } else { RED });
        let dst = Color::rgba(255, 255, 255, 0);
        let out = ImageTrimmer::from_rgba(img).replace_color(&Color::rgb(1, 106, 253), &dst, 130);

        assert_eq!(*out.buffer().get_pixel(0, 0), Rgba([255, 255, 255, 0]));
        assert_eq!(*out.buffer().get_pixel(9, 9), RED);
    }

    #[test]
    fn test_replace_color_keeps_alpha_without_dst_alpha() {
        let img = RgbaImage::from_pixel(4, 4, Rgba([0, 0, 0, 100]));
        let out = ImageTrimmer::from_rgba(img).replace_color(&Color::BLACK, &Color::rgb(9, 9, 9), 0);
        assert_eq!(*out.buffer().get_pixel(1, 1), Rgba([9, 9, 9, 100]));
    }

    #[test]
    fn test_replace_color_idempotent() {
        let img = RgbaImage::from_fn(16, 16, |x, y| if (x + y) % 3 == 0 { BLUE } else { RED });
        let src = Color::rgb(1, 106, 253);
        let dst = Color::rgba(255, 255, 255, 0);

        let once = ImageTrimmer::from_rgba(img).replace_color(&src, &dst, 130);
        let snapshot = once.buffer().clone();
        let twice = once.replace_color(&src, &dst, 130);
        assert_eq!(twice.buffer(), &snapshot);
    }

    #[test]
    fn test_resize_to_fit() {
        let trimmer = ImageTrimmer::from_rgba(RgbaImage::from_pixel(40, 20, RED));
        let resized = trimmer.resize_to_fit(FitSize::width(20));
        assert_eq!((resized.width(), resized.height()), (20, 10));

        // 已经比约束小：不放大
        let same = resized.resize_to_fit(FitSize::width(100));
        assert_eq!((same.width(), same.height()), (20, 10));

        let by_height = same.resize_to_fit(FitSize::height(5));
        assert_eq!((by_height.width(), by_height.height()), (10, 5));
    }

    #[test]
    fn test_encode_png_roundtrip() {
        let img = letterboxed(12, 8, 2, 2);
        let encoded = ImageTrimmer::from_rgba(img.clone()).encode(ImageMime::Png, None).unwrap();
        assert_eq!(encoded.mime, ImageMime::Png);

        let decoded = ImageTrimmer::load_encoded(&encoded).unwrap();
        assert_eq!(decoded.buffer(), &img);
    }

    #[test]
    fn test_encode_jpeg_and_webp() {
        let img = letterboxed(16, 16, 2, 2);

        let jpeg = ImageTrimmer::from_rgba(img.clone())
            .encode(ImageMime::Jpeg, Some(0.8))
            .unwrap();
        let decoded = ImageTrimmer::load(&jpeg.data).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (16, 16));

        // 不给 quality 时 WebP 无损
        let webp = ImageTrimmer::from_rgba(img.clone()).encode(ImageMime::Webp, None).unwrap();
        let decoded = ImageTrimmer::load(&webp.data).unwrap();
        assert_eq!(decoded.buffer(), &img);
    }

    /// 64x64 渐变，便于观察有损压缩的差异
    fn gradient() -> RgbaImage {
        RgbaImage::from_fn(64, 64, |x, y| {
            Rgba([(x * 4) as u8, (y * 4) as u8, ((x + y) * 2) as u8, 255])
        })
    }

    #[test]
    fn test_encode_webp_uses_quality() {
        let trimmer = ImageTrimmer::from_rgba(gradient());
        let low = trimmer.encode(ImageMime::Webp, Some(0.1)).unwrap();
        let high = trimmer.encode(ImageMime::Webp, Some(1.0)).unwrap();

        assert_eq!(low.mime, ImageMime::Webp);
        assert_ne!(low.data, high.data);
        assert!(low.data.len() < high.data.len());

        let decoded = ImageTrimmer::load_encoded(&low).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (64, 64));
    }

    #[test]
    fn test_encode_png_ignores_quality() {
        let trimmer = ImageTrimmer::from_rgba(gradient());
        let a = trimmer.encode(ImageMime::Png, Some(0.1)).unwrap();
        let b = trimmer.encode(ImageMime::Png, Some(1.0)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_to_rgb_len() {
        let trimmer = ImageTrimmer::from_rgba(RgbaImage::from_pixel(5, 3, RED));
        let rgb = trimmer.to_rgb();
        assert_eq!(rgb.len(), 5 * 3 * 3);
        assert_eq!(&rgb[..3], &[200, 30, 30]);
    }

    #[test]
    fn test_load_data_url() {
        let encoded = ImageTrimmer::from_rgba(RgbaImage::from_pixel(3, 2, RED))
            .encode(ImageMime::Png, None)
            .unwrap();
        let trimmer = ImageTrimmer::load_data_url(&encoded.to_data_url()).unwrap();
        assert_eq!((trimmer.width(), trimmer.height()), (3, 2));
    }

    #[test]
    fn test_load_garbage_fails() {
        assert!(matches!(
            ImageTrimmer::load(&[1, 2, 3, 4]),
            Err(ImageTrimError::Decode(_))
        ));
    }
}
