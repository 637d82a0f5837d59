use crate::core::image::EncodedImage;

/// MediaPipe Pose 关键点名称，下标即关键点编号（导出为 `poseLandmarkMapppings`）
pub const POSE_LANDMARK_NAMES: [&str; 33] = [
    "NOSE",
    "LEFT_EYE_INNER",
    "LEFT_EYE",
    "LEFT_EYE_OUTER",
    "RIGHT_EYE_INNER",
    "RIGHT_EYE",
    "RIGHT_EYE_OUTER",
    "LEFT_EAR",
    "RIGHT_EAR",
    "MOUTH_LEFT",
    "MOUTH_RIGHT",
    "LEFT_SHOULDER",
    "RIGHT_SHOULDER",
    "LEFT_ELBOW",
    "RIGHT_ELBOW",
    "LEFT_WRIST",
    "RIGHT_WRIST",
    "LEFT_PINKY",
    "RIGHT_PINKY",
    "LEFT_INDEX",
    "RIGHT_INDEX",
    "LEFT_THUMB",
    "RIGHT_THUMB",
    "LEFT_HIP",
    "RIGHT_HIP",
    "LEFT_KNEE",
    "RIGHT_KNEE",
    "LEFT_ANKLE",
    "RIGHT_ANKLE",
    "LEFT_HEEL",
    "RIGHT_HEEL",
    "LEFT_FOOT_INDEX",
    "RIGHT_FOOT_INDEX",
];

/// 身体关键点编号
pub mod pose_index {
    pub const LEFT_SHOULDER: usize = 11;
    pub const RIGHT_SHOULDER: usize = 12;
    pub const LEFT_ELBOW: usize = 13;
    pub const RIGHT_ELBOW: usize = 14;
    pub const LEFT_WRIST: usize = 15;
    pub const RIGHT_WRIST: usize = 16;
}

/// 手部关键点编号（21 点）
pub mod hand_index {
    pub const THUMB_MCP: usize = 2;
    pub const THUMB_IP: usize = 3;
    pub const THUMB_TIP: usize = 4;
    pub const INDEX_FINGER_PIP: usize = 6;
    pub const INDEX_FINGER_DIP: usize = 7;
    pub const INDEX_FINGER_TIP: usize = 8;
    pub const MIDDLE_FINGER_PIP: usize = 10;
    pub const MIDDLE_FINGER_DIP: usize = 11;
    pub const MIDDLE_FINGER_TIP: usize = 12;
    pub const RING_FINGER_PIP: usize = 14;
    pub const RING_FINGER_DIP: usize = 15;
    pub const RING_FINGER_TIP: usize = 16;
    pub const PINKY_PIP: usize = 18;
    pub const PINKY_DIP: usize = 19;
    pub const PINKY_TIP: usize = 20;
}

pub const HAND_LANDMARK_COUNT: usize = 21;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Landmark {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    /// 仅身体关键点有置信度
    pub visibility: Option<f64>,
}

impl Landmark {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self {
            x,
            y,
            z,
            visibility: None,
        }
    }

    pub fn with_visibility(mut self, visibility: f64) -> Self {
        self.visibility = Some(visibility);
        self
    }

    /// `self - other`
    pub fn diff(&self, other: &Landmark) -> [f64; 3] {
        [self.x - other.x, self.y - other.y, self.z - other.z]
    }

    pub fn to_body_tuple(&self) -> [f64; 4] {
        [self.x, self.y, self.z, self.visibility.unwrap_or(0.0)]
    }

    pub fn to_hand_tuple(&self) -> [f64; 3] {
        [self.x, self.y, self.z]
    }
}

/// 外部关键点检测器对单帧的输出
///
/// 所有字段都可能缺失：没有身体关键点的帧会被跳过。
#[derive(Debug, Clone, Default)]
pub struct LandmarkResult {
    /// 归一化坐标的身体关键点（33 点）
    pub body_landmarks: Option<Vec<Landmark>>,
    /// 世界坐标的身体关键点，存在时优先用于向量计算
    pub world_landmarks: Option<Vec<Landmark>>,
    pub left_hand_landmarks: Option<Vec<Landmark>>,
    pub right_hand_landmarks: Option<Vec<Landmark>>,
    /// 原始帧画面
    pub source_frame: Option<EncodedImage>,
}

impl LandmarkResult {
    /// 用于向量计算和导出的身体关键点
    pub fn pose_landmarks(&self) -> Option<&[Landmark]> {
        let body = self.body_landmarks.as_deref().filter(|l| !l.is_empty())?;
        match self.world_landmarks.as_deref() {
            Some(world) if !world.is_empty() => Some(world),
            _ => Some(body),
        }
    }

    pub fn left_hand(&self) -> Option<&[Landmark]> {
        self.left_hand_landmarks.as_deref().filter(|l| !l.is_empty())
    }

    pub fn right_hand(&self) -> Option<&[Landmark]> {
        self.right_hand_landmarks.as_deref().filter(|l| !l.is_empty())
    }
}
