//! 视频姿态提取器

use crate::core::image::EncodedImage;
use crate::core::pose::{LandmarkResult, PoseSet, PoseSetConfig, PoseSetError};
use log::info;

/// 提取统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExtractionStats {
    pub received_frames: u64,
    pub accepted_frames: u64,
    pub skipped_frames: u64,
}

/// 视频姿态提取器 - 相似帧合并 + 参考图片规整
///
/// ```ignore
/// let mut extractor = PoseExtractor::create(PoseSetConfig::default());
/// extractor.set_video("dance.mp4", 1280, 720, 30_000);
/// extractor.push_frame(0, result, None, None);
/// let zip = extractor.export_zip()?;
/// ```
pub struct PoseExtractor {
    pose_set: PoseSet,
    stats: ExtractionStats,
}

impl PoseExtractor {
    pub fn create(config: PoseSetConfig) -> Self {
        info!("🎬 PoseExtractor: created");
        Self {
            pose_set: PoseSet::new(config),
            stats: ExtractionStats::default(),
        }
    }

    /// 从 JSON5 配置文本创建
    pub fn from_json5_config(text: &str) -> Result<Self, PoseSetError> {
        let config = PoseSetConfig::from_json5(text)?;
        Ok(Self::create(config))
    }

    pub fn set_video(&mut self, name: &str, width: u32, height: u32, duration_ms: i64) {
        self.pose_set.set_video_name(name);
        self.pose_set.set_video_metadata(width, height, duration_ms);
    }

    /// 推入一帧检测结果，返回该帧是否被接收
    pub fn push_frame(
        &mut self,
        time_ms: i64,
        result: LandmarkResult,
        pose_preview: Option<EncodedImage>,
        face_frame: Option<EncodedImage>,
    ) -> bool {
        self.stats.received_frames += 1;
        let accepted = self
            .pose_set
            .push_pose(time_ms, result, pose_preview, face_frame)
            .is_some();
        if accepted {
            self.stats.accepted_frames += 1;
        } else {
            self.stats.skipped_frames += 1;
        }
        accepted
    }

    pub fn finalize(&mut self) {
        self.pose_set.finalize();
    }

    pub fn export_json(&mut self) -> Result<String, PoseSetError> {
        self.pose_set.get_json()
    }

    pub fn export_zip(&mut self) -> Result<Vec<u8>, PoseSetError> {
        self.pose_set.get_zip()
    }

    /// 载入已有归档，替换当前姿态集
    pub fn import_zip(&mut self, bytes: &[u8], include_images: bool) -> Result<(), PoseSetError> {
        self.pose_set.load_zip(bytes, include_images)
    }

    pub fn stats(&self) -> ExtractionStats {
        self.stats
    }

    pub fn pose_set(&self) -> &PoseSet {
        &self.pose_set
    }

    /// 重置状态（保留配置）
    pub fn reset(&mut self) {
        self.pose_set = PoseSet::new(self.pose_set.config().clone());
        self.stats = ExtractionStats::default();
    }
}

impl Drop for PoseExtractor {
    fn drop(&mut self) {
        info!("🗑️ PoseExtractor: released");
    }
}
