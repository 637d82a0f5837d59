use super::item::{DuplicatedItem, PoseSetItem};
use super::similarity::{body_similarity, hand_similarity, HAND_NOT_COMPARABLE};
use log::debug;
use rayon::prelude::*;

/// 类似姿态队列：缓存一段连续相似的帧，直到姿态发生变化
#[derive(Debug, Default)]
pub struct SimilarPoseQueue {
    items: Vec<PoseSetItem>,
}

impl SimilarPoseQueue {
    pub fn new() -> Self {
        Self { items: Vec::new() }
    }

    pub fn push(&mut self, item: PoseSetItem) {
        self.items.push(item);
    }

    pub fn last(&self) -> Option<&PoseSetItem> {
        self.items.last()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, PoseSetItem> {
        self.items.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// 清空队列并返回需要提交的姿态
    ///
    /// - 0 个：不提交
    /// - 1 个：原样提交
    /// - 2 个以上：选出代表姿态，其余折叠进它的 `debug.duplicated_items`；
    ///   `collapse` 为 false 时仍提交全部（诊断用）
    ///
    /// `next_time_ms` 用于确定最后一个姿态的持续时间。
    pub fn flush(&mut self, next_time_ms: Option<i64>, collapse: bool) -> Vec<PoseSetItem> {
        let mut items = std::mem::take(&mut self.items);
        if items.is_empty() {
            return items;
        }

        Self::assign_durations(&mut items, next_time_ms);
        if items.len() == 1 {
            return items;
        }

        let Some(selected) = select_representative(&items) else {
            return items;
        };

        let duplicated: Vec<DuplicatedItem> = items
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != selected)
            .map(|(_, item)| item.as_duplicated())
            .collect();
        let merged_time_ms = items[0].time_ms;
        let merged_duration_ms: i64 = items
            .iter()
            .filter(|item| item.is_duration_resolved())
            .map(|item| item.duration_ms)
            .sum();

        debug!(
            "🧩 flush {} similar poses: selected t={}, merged {}ms from t={}",
            items.len(),
            items[selected].time_ms,
            merged_duration_ms,
            merged_time_ms
        );

        let representative = &mut items[selected];
        representative.debug.duplicated_items.extend(duplicated);
        representative.merged_time_ms = merged_time_ms;
        representative.merged_duration_ms = merged_duration_ms;

        if collapse {
            vec![items.swap_remove(selected)]
        } else {
            items
        }
    }

    /// 每个姿态的持续时间 = 下一个姿态的时刻 - 自身时刻
    fn assign_durations(items: &mut [PoseSetItem], next_time_ms: Option<i64>) {
        for i in 0..items.len().saturating_sub(1) {
            items[i].duration_ms = items[i + 1].time_ms - items[i].time_ms;
        }
        if let (Some(last), Some(next)) = (items.last_mut(), next_time_ms) {
            last.duration_ms = next - last.time_ms;
        }
    }
}

/// 选出与整段最“居中相似”的姿态下标
///
/// 对每个样本累加它与所有候选（含自身）的身体相似度和可用的手部相似度，
/// 取总分最高者，同分取先出现者。
pub fn select_representative(poses: &[PoseSetItem]) -> Option<usize> {
    match poses.len() {
        0 => None,
        1 => Some(0),
        _ => {
            let scores = aggregate_scores(poses);
            let mut best = 0;
            for (i, &score) in scores.iter().enumerate().skip(1) {
                if score > scores[best] {
                    best = i;
                }
            }
            Some(best)
        }
    }
}

fn aggregate_scores(poses: &[PoseSetItem]) -> Vec<f64> {
    poses
        .par_iter()
        .map(|sample| {
            poses
                .iter()
                .map(|candidate| {
                    let mut score = body_similarity(&sample.body_vector, &candidate.body_vector);
                    if let (Some(a), Some(b)) = (&sample.hand_vector, &candidate.hand_vector) {
                        let hand = hand_similarity(a, b);
                        if hand != HAND_NOT_COMPARABLE {
                            score += hand;
                        }
                    }
                    score
                })
                .sum::<f64>()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::pose::item::DURATION_UNRESOLVED;
    use crate::core::pose::vector::tests::{body_landmarks, hand_landmarks};
    use crate::core::pose::vector::{BodyVector, HandVector};

    fn pose(time_ms: i64, angle: f64) -> PoseSetItem {
        let body = BodyVector::from_landmarks(&body_landmarks(angle, angle)).unwrap();
        PoseSetItem::new(time_ms, body, None)
    }

    fn pose_with_hand(time_ms: i64, hand_angle: f64) -> PoseSetItem {
        let mut item = pose(time_ms, 0.0);
        let right = hand_landmarks(hand_angle);
        item.hand_vector = HandVector::from_landmarks(None, Some(right.as_slice()));
        item
    }

    #[test]
    fn test_flush_empty_is_noop() {
        let mut queue = SimilarPoseQueue::new();
        assert!(queue.flush(Some(100), true).is_empty());
    }

    #[test]
    fn test_flush_single_commits_as_is() {
        let mut queue = SimilarPoseQueue::new();
        queue.push(pose(100, 0.0));

        let committed = queue.flush(Some(350), true);
        assert_eq!(committed.len(), 1);
        assert_eq!(committed[0].time_ms, 100);
        assert_eq!(committed[0].duration_ms, 250);
        assert!(committed[0].debug.duplicated_items.is_empty());
        assert!(queue.is_empty());
    }

    #[test]
    fn test_flush_single_without_next_time() {
        let mut queue = SimilarPoseQueue::new();
        queue.push(pose(100, 0.0));
        let committed = queue.flush(None, true);
        assert_eq!(committed[0].duration_ms, DURATION_UNRESOLVED);
    }

    #[test]
    fn test_flush_selects_most_central() {
        let mut queue = SimilarPoseQueue::new();
        queue.push(pose(0, 0.0));
        queue.push(pose(200, 0.3));
        queue.push(pose(400, 0.6));

        let committed = queue.flush(Some(1000), true);
        assert_eq!(committed.len(), 1);

        let selected = &committed[0];
        assert_eq!(selected.time_ms, 200);
        assert_eq!(selected.duration_ms, 200);
        assert_eq!(selected.merged_time_ms, 0);
        assert_eq!(selected.merged_duration_ms, 200 + 200 + 600);
        assert_eq!(
            selected.debug.duplicated_items,
            vec![
                DuplicatedItem {
                    time_ms: 0,
                    duration_ms: 200
                },
                DuplicatedItem {
                    time_ms: 400,
                    duration_ms: 600
                },
            ]
        );
        assert!(queue.is_empty());
    }

    #[test]
    fn test_select_ties_first_occurrence() {
        let poses = vec![pose(0, 0.5), pose(100, 0.5), pose(200, 0.5)];
        assert_eq!(select_representative(&poses), Some(0));
        assert_eq!(select_representative(&poses[..1]), Some(0));
        assert_eq!(select_representative(&[]), None);
    }

    #[test]
    fn test_select_uses_hand_similarity() {
        // 身体完全相同，手部差异决定代表；居中的 0.1 与另外两个都最接近
        let poses = vec![
            pose_with_hand(0, 0.0),
            pose_with_hand(100, 0.1),
            pose_with_hand(200, 2.5),
        ];
        assert_eq!(select_representative(&poses), Some(1));
    }

    #[test]
    fn test_flush_without_collapse_keeps_all() {
        let mut queue = SimilarPoseQueue::new();
        queue.push(pose(0, 0.0));
        queue.push(pose(100, 0.0));

        let committed = queue.flush(Some(300), false);
        assert_eq!(committed.len(), 2);
        assert_eq!(committed[0].time_ms, 0);
        assert_eq!(committed[1].time_ms, 100);
        assert_eq!(committed[0].debug.duplicated_items.len(), 1);
        assert_eq!(committed[0].merged_duration_ms, 300);
    }
}
