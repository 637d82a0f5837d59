use super::vector::{BodyVector, HandSide, HandVector, Vector3};

/// 身体相似度阈值（默认）
pub const DEFAULT_BODY_THRESHOLD: f64 = 0.8;
/// 手部相似度阈值（默认）
pub const DEFAULT_HAND_THRESHOLD: f64 = 0.75;
/// 两侧手都无法比较时的返回值
pub const HAND_NOT_COMPARABLE: f64 = -1.0;

/// 余弦相似度；任一向量为零向量时返回 0
pub fn cosine_similarity(a: &Vector3, b: &Vector3) -> f64 {
    let dot: f64 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let na = a.iter().map(|x| x * x).sum::<f64>().sqrt();
    let nb = b.iter().map(|x| x * x).sum::<f64>().sqrt();
    if na == 0.0 || nb == 0.0 {
        return 0.0;
    }
    dot / (na * nb)
}

/// 4 个手臂向量余弦相似度的平均值
pub fn body_similarity(a: &BodyVector, b: &BodyVector) -> f64 {
    let sum: f64 = a
        .vectors()
        .iter()
        .zip(b.vectors())
        .map(|(va, vb)| cosine_similarity(va, vb))
        .sum();
    sum / a.vectors().len() as f64
}

/// 某一侧 10 个向量的余弦相似度之和；任一方缺少该侧时返回 `None`
fn hand_side_similarity_sum(a: &HandVector, b: &HandVector, side: HandSide) -> Option<f64> {
    if !a.has_side(side) || !b.has_side(side) {
        return None;
    }

    let sum: f64 = a
        .side(side)
        .iter()
        .zip(b.side(side))
        .filter_map(|(va, vb)| Some(cosine_similarity(va.as_ref()?, vb.as_ref()?)))
        .sum();
    Some(sum)
}

/// 手部相似度
///
/// - 两侧都可比：20 个向量的平均
/// - 仅一侧可比：该侧 10 个向量的平均；若 `b` 有另一侧而 `a` 没有，结果减半
/// - 都不可比：[`HAND_NOT_COMPARABLE`]
///
/// 注意该函数不对称。
pub fn hand_similarity(a: &HandVector, b: &HandVector) -> f64 {
    let right = hand_side_similarity_sum(a, b, HandSide::Right);
    let left = hand_side_similarity_sum(a, b, HandSide::Left);

    match (right, left) {
        (Some(r), Some(l)) => (r + l) / 20.0,
        (Some(sum), None) | (None, Some(sum)) => {
            let computed = if right.is_some() {
                HandSide::Right
            } else {
                HandSide::Left
            };
            let missing = computed.opposite();
            let mean = sum / 10.0;
            if b.has_side(missing) && !a.has_side(missing) {
                mean / 2.0
            } else {
                mean
            }
        }
        (None, None) => HAND_NOT_COMPARABLE,
    }
}

pub fn is_similar_body(a: &BodyVector, b: &BodyVector, threshold: f64) -> bool {
    body_similarity(a, b) >= threshold
}

/// 无法比较（[`HAND_NOT_COMPARABLE`]）时视为相似，避免手短暂丢失导致姿态被拆分
pub fn is_similar_hand(a: &HandVector, b: &HandVector, threshold: f64) -> bool {
    let similarity = hand_similarity(a, b);
    similarity == HAND_NOT_COMPARABLE || similarity >= threshold
}
