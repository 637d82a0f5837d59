//! 姿态集的 JSON / ZIP 导入导出
//!
//! JSON 不包含图片；ZIP 内为 `poses.json` 加上每个姿态的
//! `frame-{t}.{ext}`、`pose-{t}.{ext}`、`face-{t}.{ext}`。

use super::error::{PoseSetError, Result};
use super::item::{millis, PoseSetItem, VideoMetadata, MERGE_UNSET};
use super::landmark::POSE_LANDMARK_NAMES;
use super::pose_set::PoseSet;
use super::vector::{BodyVector, HandVector, Vector3, BODY_VECTOR_LEN, HAND_VECTOR_LEN};
use crate::core::image::{EncodedImage, ImageMime, ImageTrimmer};
use log::{error, info};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::io::{Cursor, Read, Write};
use zip::result::ZipError;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

pub const GENERATOR: &str = "mp-video-pose-extractor";
pub const VERSION: u64 = 1;
const POSES_JSON: &str = "poses.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoseSetJson {
    pub generator: String,
    pub version: u64,
    pub video: VideoMetadata,
    pub poses: Vec<PoseSetJsonItem>,
    #[serde(rename = "poseLandmarkMapppings", default)]
    pub pose_landmark_mappings: Vec<String>,
}

fn merge_unset() -> i64 {
    MERGE_UNSET
}

/// 单个姿态的紧凑表示
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoseSetJsonItem {
    #[serde(deserialize_with = "millis::deserialize")]
    pub t: i64,
    #[serde(deserialize_with = "millis::deserialize")]
    pub d: i64,
    pub p: Vec<[f64; 4]>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub l: Option<Vec<[f64; 3]>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub r: Option<Vec<[f64; 3]>>,
    pub v: Vec<Vector3>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub h: Option<Vec<Option<Vector3>>>,
    #[serde(default)]
    pub e: Map<String, Value>,
    #[serde(default = "merge_unset", deserialize_with = "millis::deserialize")]
    pub md: i64,
    #[serde(default = "merge_unset", deserialize_with = "millis::deserialize")]
    pub mt: i64,
}

impl From<&PoseSetItem> for PoseSetJsonItem {
    fn from(item: &PoseSetItem) -> Self {
        Self {
            t: item.time_ms,
            d: item.duration_ms,
            p: item.body_landmarks.clone(),
            l: item.left_hand_landmarks.clone(),
            r: item.right_hand_landmarks.clone(),
            v: item.body_vector.to_vec(),
            h: item.hand_vector.as_ref().map(HandVector::to_vec),
            e: item.extended_data.clone(),
            md: item.merged_duration_ms,
            mt: item.merged_time_ms,
        }
    }
}

impl TryFrom<PoseSetJsonItem> for PoseSetItem {
    type Error = PoseSetError;

    fn try_from(json: PoseSetJsonItem) -> Result<Self> {
        let body_vector =
            BodyVector::from_slice(&json.v).ok_or(PoseSetError::InvalidVectorLength {
                kind: "body",
                expected: BODY_VECTOR_LEN,
                actual: json.v.len(),
            })?;
        let hand_vector = match &json.h {
            Some(h) => Some(HandVector::from_slice(h).ok_or(
                PoseSetError::InvalidVectorLength {
                    kind: "hand",
                    expected: HAND_VECTOR_LEN,
                    actual: h.len(),
                },
            )?),
            None => None,
        };

        let mut item = PoseSetItem::new(json.t, body_vector, hand_vector);
        item.duration_ms = json.d;
        item.body_landmarks = json.p;
        item.left_hand_landmarks = json.l;
        item.right_hand_landmarks = json.r;
        item.extended_data = json.e;
        item.merged_duration_ms = json.md;
        item.merged_time_ms = json.mt;
        Ok(item)
    }
}

/// 归档内的图片种类
#[derive(Debug, Clone, Copy)]
enum ImageKind {
    Frame,
    PosePreview,
    Face,
}

impl ImageKind {
    const ALL: [ImageKind; 3] = [ImageKind::Frame, ImageKind::PosePreview, ImageKind::Face];

    fn file_name(&self, time_ms: i64, mime: ImageMime) -> String {
        let prefix = match self {
            ImageKind::Frame => "frame",
            ImageKind::PosePreview => "pose",
            ImageKind::Face => "face",
        };
        format!("{}-{}.{}", prefix, time_ms, mime.extension())
    }

    fn slot<'a>(&self, item: &'a PoseSetItem) -> &'a Option<EncodedImage> {
        match self {
            ImageKind::Frame => &item.images.frame,
            ImageKind::PosePreview => &item.images.pose_preview,
            ImageKind::Face => &item.images.face_frame,
        }
    }

    fn slot_mut<'a>(&self, item: &'a mut PoseSetItem) -> &'a mut Option<EncodedImage> {
        match self {
            ImageKind::Frame => &mut item.images.frame,
            ImageKind::PosePreview => &mut item.images.pose_preview,
            ImageKind::Face => &mut item.images.face_frame,
        }
    }
}

impl PoseSet {
    pub fn to_pose_set_json(&self) -> PoseSetJson {
        PoseSetJson {
            generator: GENERATOR.to_string(),
            version: VERSION,
            video: self.video().clone(),
            poses: self.poses().iter().map(PoseSetJsonItem::from).collect(),
            pose_landmark_mappings: POSE_LANDMARK_NAMES.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// 导出 JSON；未定稿时先定稿
    pub fn get_json(&mut self) -> Result<String> {
        if !self.is_finalized() {
            self.finalize();
        }
        Ok(serde_json::to_string(&self.to_pose_set_json())?)
    }

    /// 从 JSON 替换当前内容，保留本地配置
    pub fn load_json(&mut self, json: &str) -> Result<()> {
        let value: Value = serde_json::from_str(json)?;

        let generator = value
            .get("generator")
            .and_then(Value::as_str)
            .unwrap_or_default();
        if generator != GENERATOR {
            return Err(PoseSetError::InvalidGenerator(generator.to_string()));
        }
        let version = value.get("version").and_then(Value::as_u64).unwrap_or(0);
        if version != VERSION {
            return Err(PoseSetError::UnsupportedVersion(version));
        }

        let parsed: PoseSetJson = serde_json::from_value(value)?;
        let poses = parsed
            .poses
            .into_iter()
            .map(PoseSetItem::try_from)
            .collect::<Result<Vec<_>>>()?;

        info!("📥 load_json: {} poses from \"{}\"", poses.len(), parsed.video.name);
        *self = PoseSet::from_parts(self.config().clone(), parsed.video, poses);
        Ok(())
    }

    /// 导出 ZIP；任何一步失败都中止整个导出
    pub fn get_zip(&mut self) -> Result<Vec<u8>> {
        let json = self.get_json()?;
        self.write_zip(&json).map_err(|e| {
            error!("❌ get_zip failed: {}", e);
            e
        })
    }

    fn write_zip(&self, json: &str) -> Result<Vec<u8>> {
        let mime = self.config().image_mime;
        let quality = self.config().image_quality;
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        writer.start_file(POSES_JSON, options)?;
        writer.write_all(json.as_bytes())?;

        let mut image_count = 0;
        for pose in self.poses() {
            for kind in ImageKind::ALL {
                let Some(image) = kind.slot(pose) else {
                    continue;
                };
                let data = if image.mime == mime {
                    image.data.clone()
                } else {
                    ImageTrimmer::load_encoded(image)?.encode(mime, Some(quality))?.data
                };
                writer.start_file(kind.file_name(pose.time_ms, mime), options)?;
                writer.write_all(&data)?;
                image_count += 1;
            }
        }

        let cursor = writer.finish()?;
        let bytes = cursor.into_inner();
        info!(
            "📦 get_zip: {} poses, {} images, {} bytes",
            self.len(),
            image_count,
            bytes.len()
        );
        Ok(bytes)
    }

    /// 从 ZIP 替换当前内容；缺失的图片文件会被忽略
    pub fn load_zip(&mut self, bytes: &[u8], include_images: bool) -> Result<()> {
        let mut archive = ZipArchive::new(Cursor::new(bytes))?;
        let json = match read_entry(&mut archive, POSES_JSON)? {
            Some(data) => String::from_utf8(data)
                .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?,
            None => return Err(PoseSetError::MissingPosesJson),
        };
        self.load_json(&json)?;

        if !include_images {
            return Ok(());
        }

        let mime = self.config().image_mime;
        for pose in self.poses_mut() {
            for kind in ImageKind::ALL {
                let name = kind.file_name(pose.time_ms, mime);
                *kind.slot_mut(pose) =
                    read_entry(&mut archive, &name)?.map(|data| EncodedImage::new(mime, data));
            }
        }
        Ok(())
    }
}

fn read_entry<R: Read + std::io::Seek>(
    archive: &mut ZipArchive<R>,
    name: &str,
) -> Result<Option<Vec<u8>>> {
    match archive.by_name(name) {
        Ok(mut file) => {
            let mut data = Vec::new();
            file.read_to_end(&mut data)?;
            Ok(Some(data))
        }
        Err(ZipError::FileNotFound) => Ok(None),
        Err(e) => Err(e.into()),
    }
}
