use super::config::PoseSetConfig;
use super::error::{PoseSetError, Result};
use super::item::{PoseImages, PoseSetItem, VideoMetadata};
use super::landmark::{Landmark, LandmarkResult};
use super::normalize;
use super::queue::SimilarPoseQueue;
use super::similarity::{
    body_similarity, hand_similarity, is_similar_body, is_similar_hand, HAND_NOT_COMPARABLE,
};
use super::vector::{BodyVector, HandVector};
use crate::core::image::EncodedImage;
use log::{debug, info, warn};
use serde_json::Value;

/// 相似姿态检索的比较对象
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SimilarPoseTarget {
    #[default]
    All,
    BodyPose,
    HandPose,
}

/// 相似姿态检索结果
#[derive(Debug, Clone, PartialEq)]
pub struct SimilarPoseItem {
    pub time_ms: i64,
    pub similarity: f64,
    pub body_similarity: f64,
    /// 双方都有可比较的手部向量时才有值
    pub hand_similarity: Option<f64>,
}

/// 姿态集
///
/// 逐帧接收关键点检测结果，把连续相似的帧合并为一个姿态；
/// `finalize()` 后做整体去重并规整参考图片。
#[derive(Debug)]
pub struct PoseSet {
    config: PoseSetConfig,
    video: VideoMetadata,
    poses: Vec<PoseSetItem>,
    queue: SimilarPoseQueue,
    finalized: bool,
}

impl Default for PoseSet {
    fn default() -> Self {
        Self::new(PoseSetConfig::default())
    }
}

impl PoseSet {
    pub fn new(config: PoseSetConfig) -> Self {
        Self {
            config,
            video: VideoMetadata::default(),
            poses: Vec::new(),
            queue: SimilarPoseQueue::new(),
            finalized: false,
        }
    }

    pub(crate) fn from_parts(config: PoseSetConfig, video: VideoMetadata, poses: Vec<PoseSetItem>) -> Self {
        Self {
            config,
            video,
            poses,
            queue: SimilarPoseQueue::new(),
            finalized: true,
        }
    }

    pub fn config(&self) -> &PoseSetConfig {
        &self.config
    }

    pub fn video(&self) -> &VideoMetadata {
        &self.video
    }

    pub fn set_video_name(&mut self, name: impl Into<String>) {
        self.video.name = name.into();
    }

    pub fn set_video_metadata(&mut self, width: u32, height: u32, duration_ms: i64) {
        self.video.width = width;
        self.video.height = height;
        self.video.duration = duration_ms;
    }

    /// 已提交的姿态（按时间排序）
    pub fn poses(&self) -> &[PoseSetItem] {
        &self.poses
    }

    pub(crate) fn poses_mut(&mut self) -> &mut [PoseSetItem] {
        &mut self.poses
    }

    pub fn len(&self) -> usize {
        self.poses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.poses.is_empty()
    }

    /// 队列中尚未提交的帧数
    pub fn queued_len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    pub fn pose_by_time(&self, time_ms: i64) -> Option<&PoseSetItem> {
        self.poses.iter().find(|pose| pose.time_ms == time_ms)
    }

    /// 接收一帧检测结果
    ///
    /// 没有身体关键点的帧被跳过并返回 `None`；否则返回进入队列的候选姿态。
    pub fn push_pose(
        &mut self,
        time_ms: i64,
        result: LandmarkResult,
        pose_preview: Option<EncodedImage>,
        face_frame: Option<EncodedImage>,
    ) -> Option<&PoseSetItem> {
        if self.finalized {
            warn!("⚠️ t={}: pose set already finalized, frame ignored", time_ms);
            return None;
        }

        let Some(landmarks) = result.pose_landmarks() else {
            debug!("t={}: no body landmarks, frame skipped", time_ms);
            return None;
        };
        let Some(body_vector) = BodyVector::from_landmarks(landmarks) else {
            warn!("⚠️ t={}: incomplete body landmarks, frame skipped", time_ms);
            return None;
        };
        let hand_vector = HandVector::from_landmarks(result.left_hand(), result.right_hand());

        if self.video.first_pose_detected_time.is_none() {
            self.video.first_pose_detected_time = Some(time_ms);
        }

        let mut item = PoseSetItem::new(time_ms, body_vector, hand_vector);
        item.body_landmarks = result
            .body_landmarks
            .iter()
            .flatten()
            .map(Landmark::to_body_tuple)
            .collect();
        item.left_hand_landmarks = result.left_hand().map(to_hand_tuples);
        item.right_hand_landmarks = result.right_hand().map(to_hand_tuples);
        item.images = PoseImages {
            frame: result.source_frame,
            pose_preview,
            face_frame,
        };

        let last = self.queue.last().or(self.poses.last());
        let diverged = last.is_some_and(|last| !self.is_same_pose(last, &item));
        if diverged {
            let committed = self
                .queue
                .flush(Some(time_ms), self.config.collapse_similar_poses);
            self.poses.extend(committed);
        }

        self.queue.push(item);
        self.queue.last()
    }

    /// 流式接收时的同一姿态判定：只有“手丢失”才强制视为不同
    fn is_same_pose(&self, last: &PoseSetItem, new: &PoseSetItem) -> bool {
        if !is_similar_body(
            &last.body_vector,
            &new.body_vector,
            self.config.body_similarity_threshold,
        ) {
            return false;
        }

        match (&last.hand_vector, &new.hand_vector) {
            (Some(a), Some(b)) => is_similar_hand(a, b, self.config.hand_similarity_threshold),
            (Some(_), None) => false,
            (None, _) => true,
        }
    }

    /// 定稿：清空队列 → 补全持续时间 → 去重 → 丢弃首个姿态 → 规整图片
    pub fn finalize(&mut self) {
        if self.finalized {
            return;
        }
        info!(
            "🏁 finalize: {} committed, {} queued",
            self.poses.len(),
            self.queue.len()
        );

        let video_end = (self.video.duration > 0).then_some(self.video.duration);
        let committed = self
            .queue
            .flush(video_end, self.config.collapse_similar_poses);
        self.poses.extend(committed);
        self.resolve_durations();

        if self.config.remove_duplicates_on_finalize {
            self.remove_duplicated_poses();
        }

        // 第一个姿态来自开头的过渡帧
        if !self.poses.is_empty() {
            let dropped = self.poses.remove(0);
            debug!("first pose t={} dropped", dropped.time_ms);
        }

        normalize::normalize_poses(&mut self.poses, &self.config);
        self.finalized = true;
        info!("✅ finalize done: {} poses", self.poses.len());
    }

    fn resolve_durations(&mut self) {
        let video_end = (self.video.duration > 0).then_some(self.video.duration);
        for i in 0..self.poses.len() {
            if self.poses[i].is_duration_resolved() {
                continue;
            }
            let next = self.poses.get(i + 1).map(|p| p.time_ms).or(video_end);
            if let Some(next) = next {
                self.poses[i].duration_ms = next - self.poses[i].time_ms;
            }
        }
    }

    /// 整体去重：与已保留的姿态逐个比较，先出现者保留
    pub fn remove_duplicated_poses(&mut self) {
        let body_threshold = self.config.body_similarity_threshold;
        let hand_threshold = self.config.dedup_hand_similarity_threshold;
        let is_duplicate = |kept: &PoseSetItem, pose: &PoseSetItem| {
            if !is_similar_body(&kept.body_vector, &pose.body_vector, body_threshold) {
                return false;
            }
            match (&kept.hand_vector, &pose.hand_vector) {
                (Some(a), Some(b)) => is_similar_hand(a, b, hand_threshold),
                _ => false,
            }
        };

        let poses = std::mem::take(&mut self.poses);
        let total = poses.len();
        let mut kept: Vec<PoseSetItem> = Vec::with_capacity(total);
        for pose in poses {
            match kept.iter_mut().find(|k| is_duplicate(k, &pose)) {
                Some(original) => original.debug.duplicated_items.push(pose.as_duplicated()),
                None => kept.push(pose),
            }
        }

        info!("🔍 remove duplicated poses: {} -> {}", total, kept.len());
        self.poses = kept;
    }

    /// 给指定时刻的姿态（队列中或已提交）附加扩展数据
    pub fn set_extended_data(&mut self, time_ms: i64, key: impl Into<String>, value: Value) -> bool {
        let target = self
            .queue
            .iter_mut()
            .chain(self.poses.iter_mut())
            .find(|pose| pose.time_ms == time_ms);
        match target {
            Some(pose) => {
                pose.extended_data.insert(key.into(), value);
                true
            }
            None => false,
        }
    }

    /// 在已提交的姿态中查找与给定检测结果相似的姿态
    pub fn similar_poses(
        &self,
        result: &LandmarkResult,
        threshold: f64,
        target: SimilarPoseTarget,
    ) -> Result<Vec<SimilarPoseItem>> {
        let body = result
            .pose_landmarks()
            .and_then(BodyVector::from_landmarks)
            .ok_or(PoseSetError::NoBodyVector)?;
        let hand = HandVector::from_landmarks(result.left_hand(), result.right_hand());
        if target == SimilarPoseTarget::HandPose && hand.is_none() {
            return Err(PoseSetError::NoHandVector);
        }

        let mut similar = Vec::new();
        for pose in &self.poses {
            let body_sim = body_similarity(&pose.body_vector, &body);
            let hand_sim = match (&pose.hand_vector, &hand) {
                (Some(a), Some(b)) => Some(hand_similarity(a, b)),
                _ => None,
            }
            .filter(|&s| s != HAND_NOT_COMPARABLE);

            let similarity = match target {
                SimilarPoseTarget::BodyPose => body_sim,
                SimilarPoseTarget::HandPose => match hand_sim {
                    Some(s) => s,
                    None => continue,
                },
                SimilarPoseTarget::All => match hand_sim {
                    Some(s) => (body_sim + s) / 2.0,
                    None => body_sim,
                },
            };

            if similarity >= threshold {
                similar.push(SimilarPoseItem {
                    time_ms: pose.time_ms,
                    similarity,
                    body_similarity: body_sim,
                    hand_similarity: hand_sim,
                });
            }
        }

        Ok(similar)
    }
}

fn to_hand_tuples(landmarks: &[Landmark]) -> Vec<[f64; 3]> {
    landmarks.iter().map(Landmark::to_hand_tuple).collect()
}
