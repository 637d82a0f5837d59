//! 关键点差分向量
//!
//! 用相邻关键点之差代替原始坐标作为相似度比较的“指纹”，对平移不敏感。
//! 序列化时按固定的名称顺序展开为数组。

use super::landmark::{hand_index, pose_index, Landmark, HAND_LANDMARK_COUNT};
use std::ops::Range;

pub type Vector3 = [f64; 3];

/// BodyVector 的名称顺序（JSON `v` 的下标）
pub const BODY_VECTOR_MAPPINGS: [&str; 4] = [
    // 右臂
    "rightWristToRightElbow",
    "rightElbowToRightShoulder",
    // 左臂
    "leftWristToLeftElbow",
    "leftElbowToLeftShoulder",
];

/// HandVector 的名称顺序（JSON `h` 的下标），前 10 个为右手
pub const HAND_VECTOR_MAPPINGS: [&str; 20] = [
    "rightThumbTipToFirstJoint",
    "rightThumbFirstJointToSecondJoint",
    "rightIndexFingerTipToFirstJoint",
    "rightIndexFingerFirstJointToSecondJoint",
    "rightMiddleFingerTipToFirstJoint",
    "rightMiddleFingerFirstJointToSecondJoint",
    "rightRingFingerTipToFirstJoint",
    "rightRingFingerFirstJointToSecondJoint",
    "rightPinkyFingerTipToFirstJoint",
    "rightPinkyFingerFirstJointToSecondJoint",
    "leftThumbTipToFirstJoint",
    "leftThumbFirstJointToSecondJoint",
    "leftIndexFingerTipToFirstJoint",
    "leftIndexFingerFirstJointToSecondJoint",
    "leftMiddleFingerTipToFirstJoint",
    "leftMiddleFingerFirstJointToSecondJoint",
    "leftRingFingerTipToFirstJoint",
    "leftRingFingerFirstJointToSecondJoint",
    "leftPinkyFingerTipToFirstJoint",
    "leftPinkyFingerFirstJointToSecondJoint",
];

pub const BODY_VECTOR_LEN: usize = BODY_VECTOR_MAPPINGS.len();
pub const HAND_VECTOR_LEN: usize = HAND_VECTOR_MAPPINGS.len();
const HAND_SIDE_LEN: usize = HAND_VECTOR_LEN / 2;

/// 每根手指的 (指尖, 第一关节, 第二关节)
const FINGER_JOINTS: [(usize, usize, usize); 5] = [
    (hand_index::THUMB_TIP, hand_index::THUMB_IP, hand_index::THUMB_MCP),
    (
        hand_index::INDEX_FINGER_TIP,
        hand_index::INDEX_FINGER_DIP,
        hand_index::INDEX_FINGER_PIP,
    ),
    (
        hand_index::MIDDLE_FINGER_TIP,
        hand_index::MIDDLE_FINGER_DIP,
        hand_index::MIDDLE_FINGER_PIP,
    ),
    (
        hand_index::RING_FINGER_TIP,
        hand_index::RING_FINGER_DIP,
        hand_index::RING_FINGER_PIP,
    ),
    (hand_index::PINKY_TIP, hand_index::PINKY_DIP, hand_index::PINKY_PIP),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandSide {
    Right,
    Left,
}

impl HandSide {
    pub const BOTH: [HandSide; 2] = [HandSide::Right, HandSide::Left];

    fn range(&self) -> Range<usize> {
        match self {
            HandSide::Right => 0..HAND_SIDE_LEN,
            HandSide::Left => HAND_SIDE_LEN..HAND_VECTOR_LEN,
        }
    }

    pub fn opposite(&self) -> HandSide {
        match self {
            HandSide::Right => HandSide::Left,
            HandSide::Left => HandSide::Right,
        }
    }
}

/// 双臂的 4 个差分向量
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BodyVector {
    vectors: [Vector3; BODY_VECTOR_LEN],
}

impl BodyVector {
    pub fn new(vectors: [Vector3; BODY_VECTOR_LEN]) -> Self {
        Self { vectors }
    }

    /// 缺少肩/肘/腕关键点时返回 `None`
    pub fn from_landmarks(landmarks: &[Landmark]) -> Option<Self> {
        let point = |i: usize| landmarks.get(i);

        let right_wrist = point(pose_index::RIGHT_WRIST)?;
        let right_elbow = point(pose_index::RIGHT_ELBOW)?;
        let right_shoulder = point(pose_index::RIGHT_SHOULDER)?;
        let left_wrist = point(pose_index::LEFT_WRIST)?;
        let left_elbow = point(pose_index::LEFT_ELBOW)?;
        let left_shoulder = point(pose_index::LEFT_SHOULDER)?;

        Some(Self {
            vectors: [
                right_wrist.diff(right_elbow),
                right_elbow.diff(right_shoulder),
                left_wrist.diff(left_elbow),
                left_elbow.diff(left_shoulder),
            ],
        })
    }

    /// 从 JSON 展开形式恢复，长度不符时返回 `None`
    pub fn from_slice(values: &[Vector3]) -> Option<Self> {
        let vectors: [Vector3; BODY_VECTOR_LEN] = values.try_into().ok()?;
        Some(Self { vectors })
    }

    pub fn vectors(&self) -> &[Vector3; BODY_VECTOR_LEN] {
        &self.vectors
    }

    pub fn get(&self, name: &str) -> Option<&Vector3> {
        let index = BODY_VECTOR_MAPPINGS.iter().position(|&n| n == name)?;
        self.vectors.get(index)
    }

    pub fn to_vec(&self) -> Vec<Vector3> {
        self.vectors.to_vec()
    }
}

/// 双手的 20 个差分向量
///
/// 名称集合总是完整的：未检测到的一侧全部为 `None`（而不是省略），
/// 相似度计算依赖这一点区分“对方有而我没有”的情况。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HandVector {
    vectors: [Option<Vector3>; HAND_VECTOR_LEN],
}

impl HandVector {
    /// 两只手都没有时返回 `None`
    pub fn from_landmarks(left: Option<&[Landmark]>, right: Option<&[Landmark]>) -> Option<Self> {
        let left = left.filter(|l| l.len() >= HAND_LANDMARK_COUNT);
        let right = right.filter(|l| l.len() >= HAND_LANDMARK_COUNT);
        if left.is_none() && right.is_none() {
            return None;
        }

        let mut vectors = [None; HAND_VECTOR_LEN];
        for (side, landmarks) in [(HandSide::Right, right), (HandSide::Left, left)] {
            let Some(landmarks) = landmarks else {
                continue;
            };
            let offset = side.range().start;
            for (finger, &(tip, first, second)) in FINGER_JOINTS.iter().enumerate() {
                vectors[offset + finger * 2] = Some(landmarks[tip].diff(&landmarks[first]));
                vectors[offset + finger * 2 + 1] = Some(landmarks[first].diff(&landmarks[second]));
            }
        }

        Some(Self { vectors })
    }

    pub fn from_slice(values: &[Option<Vector3>]) -> Option<Self> {
        let vectors: [Option<Vector3>; HAND_VECTOR_LEN] = values.try_into().ok()?;
        Some(Self { vectors })
    }

    pub fn vectors(&self) -> &[Option<Vector3>; HAND_VECTOR_LEN] {
        &self.vectors
    }

    pub fn side(&self, side: HandSide) -> &[Option<Vector3>] {
        &self.vectors[side.range()]
    }

    /// 该侧所有向量都存在
    pub fn has_side(&self, side: HandSide) -> bool {
        self.side(side).iter().all(Option::is_some)
    }

    pub fn get(&self, name: &str) -> Option<Vector3> {
        let index = HAND_VECTOR_MAPPINGS.iter().position(|&n| n == name)?;
        self.vectors[index]
    }

    pub fn to_vec(&self) -> Vec<Option<Vector3>> {
        self.vectors.to_vec()
    }
}
