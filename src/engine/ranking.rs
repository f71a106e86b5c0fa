// ==========================================
// 发酵批次风险排序系统 - 优先级排序引擎
// ==========================================
// 职责: 在制批次的全序排序（工作清单）
// 输入: 在制批次列表 + 当前时刻
// 输出: 带名次的看板条目
// ==========================================

use crate::domain::batch::Batch;
use crate::domain::score::RankedBatch;
use crate::engine::scoring::ScoringEngine;
use chrono::{DateTime, Utc};
use std::cmp::Ordering;
use std::sync::Arc;

// ==========================================
// PrioritySorter - 优先级排序引擎
// ==========================================
pub struct PrioritySorter {
    scoring_engine: Arc<ScoringEngine>,
}

impl PrioritySorter {
    /// 构造函数
    ///
    /// # 参数
    /// - `scoring_engine`: 评分引擎
    pub fn new(scoring_engine: Arc<ScoringEngine>) -> Self {
        Self { scoring_engine }
    }

    // ==========================================
    // 核心方法
    // ==========================================

    /// 对在制批次评分并排序
    ///
    /// 排序键:
    /// 1) score 降序
    /// 2) started_at 升序 (FEFO/FIFO，早开始者优先)
    /// 3) batch_id 字典序升序
    ///
    /// 已确认批次不参与排序。
    ///
    /// # 返回
    /// 排序后的看板条目（rank 从 1 开始）
    pub fn rank(&self, batches: &[Batch], now: DateTime<Utc>) -> Vec<RankedBatch> {
        let mut entries: Vec<RankedBatch> = batches
            .iter()
            .filter(|batch| {
                if !batch.is_active() {
                    tracing::debug!(batch_id = %batch.id, "跳过已确认批次");
                }
                batch.is_active()
            })
            .map(|batch| {
                let breakdown = self.scoring_engine.explain(batch, now);
                RankedBatch {
                    rank: 0,
                    batch_id: batch.id.clone(),
                    label: batch.label.clone(),
                    tank_code: batch.tank_code.clone(),
                    started_at: batch.started_at,
                    age_hours: batch.age_hours(now),
                    last_ph: batch.last_measurement().map(|m| m.ph),
                    measurement_count: batch.measurements.len(),
                    score: breakdown.result.score,
                    rank_key: breakdown.result.rank_key,
                    breakdown,
                }
            })
            .collect();

        entries.sort_by(compare_entries);

        for (idx, entry) in entries.iter_mut().enumerate() {
            entry.rank = idx + 1;
        }

        entries
    }
}

// ==========================================
// 比较方法
// ==========================================

/// 比较两个看板条目的优先级
///
/// # 返回
/// Ordering::Less 表示 a 优先于 b
pub fn compare_entries(a: &RankedBatch, b: &RankedBatch) -> Ordering {
    compare_keys(
        (a.score, a.started_at, &a.batch_id),
        (b.score, b.started_at, &b.batch_id),
    )
}

/// 按 (score, started_at, id) 比较
pub fn compare_keys(
    a: (f64, DateTime<Utc>, &str),
    b: (f64, DateTime<Utc>, &str),
) -> Ordering {
    // 1. 分数高者优先
    match b.0.total_cmp(&a.0) {
        Ordering::Equal => {}
        other => return other,
    }

    // 2. 早开始者优先
    match a.1.cmp(&b.1) {
        Ordering::Equal => {}
        other => return other,
    }

    // 3. 批次号字典序
    a.2.cmp(b.2)
}
