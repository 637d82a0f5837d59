use super::vector::{BodyVector, HandVector};
use crate::core::image::EncodedImage;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// 持续时间尚未确定
pub const DURATION_UNRESOLVED: i64 = -1;
/// 未经合并
pub const MERGE_UNSET: i64 = -1;

/// JSON 中的毫秒值可能带小数（取自播放进度），读取时四舍五入为整毫秒
pub(crate) mod millis {
    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
        let value = f64::deserialize(deserializer)?;
        Ok(value.round() as i64)
    }

    pub fn deserialize_option<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<i64>, D::Error> {
        let value = Option::<f64>::deserialize(deserializer)?;
        Ok(value.map(|v| v.round() as i64))
    }
}

/// 视频元数据
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoMetadata {
    pub name: String,
    pub width: u32,
    pub height: u32,
    /// 视频总时长（毫秒）
    #[serde(deserialize_with = "millis::deserialize")]
    pub duration: i64,
    #[serde(
        default,
        deserialize_with = "millis::deserialize_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub first_pose_detected_time: Option<i64>,
}

/// 被合并进其它姿态的帧
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DuplicatedItem {
    pub time_ms: i64,
    pub duration_ms: i64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PoseDebug {
    pub duplicated_items: Vec<DuplicatedItem>,
}

/// 每个姿态的参考图片
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PoseImages {
    /// 原始帧
    pub frame: Option<EncodedImage>,
    /// 骨架预览
    pub pose_preview: Option<EncodedImage>,
    /// 人脸裁剪
    pub face_frame: Option<EncodedImage>,
}

/// 姿态集中的一项
#[derive(Debug, Clone, PartialEq)]
pub struct PoseSetItem {
    pub time_ms: i64,
    pub duration_ms: i64,
    /// 原始身体关键点 [x, y, z, visibility]
    pub body_landmarks: Vec<[f64; 4]>,
    pub left_hand_landmarks: Option<Vec<[f64; 3]>>,
    pub right_hand_landmarks: Option<Vec<[f64; 3]>>,
    pub body_vector: BodyVector,
    pub hand_vector: Option<HandVector>,
    pub images: PoseImages,
    pub extended_data: Map<String, Value>,
    pub debug: PoseDebug,
    pub merged_time_ms: i64,
    pub merged_duration_ms: i64,
}

impl PoseSetItem {
    pub fn new(time_ms: i64, body_vector: BodyVector, hand_vector: Option<HandVector>) -> Self {
        Self {
            time_ms,
            duration_ms: DURATION_UNRESOLVED,
            body_landmarks: Vec::new(),
            left_hand_landmarks: None,
            right_hand_landmarks: None,
            body_vector,
            hand_vector,
            images: PoseImages::default(),
            extended_data: Map::new(),
            debug: PoseDebug::default(),
            merged_time_ms: MERGE_UNSET,
            merged_duration_ms: MERGE_UNSET,
        }
    }

    pub fn is_duration_resolved(&self) -> bool {
        self.duration_ms != DURATION_UNRESOLVED
    }

    pub fn as_duplicated(&self) -> DuplicatedItem {
        DuplicatedItem {
            time_ms: self.time_ms,
            duration_ms: self.duration_ms,
        }
    }
}
