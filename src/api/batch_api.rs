// ==========================================
// 发酵批次风险排序系统 - 批次 API
// ==========================================
// 职责: 批次创建、pH/感官录入、确认归档、删除、优先级看板
// 红线: 每个写操作返回写入后的实体（读后写一致）
// 红线: 确认时评分由引擎计算，调用方不可指定
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use crate::api::validator::{validate_batch_id, validate_ph, validate_tank_code};
use crate::domain::batch::{Batch, HistoryRecord, Measurement};
use crate::domain::score::RankedBatch;
use crate::domain::types::{GateStatus, SensoryFlag};
use crate::engine::ranking::PrioritySorter;
use crate::engine::scoring::ScoringEngine;
use crate::repository::batch_repo::BatchRepository;
use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

// ==========================================
// BoardSnapshot - 看板快照
// ==========================================
/// 一次渲染所用的不可变看板快照
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoardSnapshot {
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub generated_at: DateTime<Utc>,
    pub entries: Vec<RankedBatch>,
    pub hold_count: usize,   // 扣留待复核
    pub urgent_count: usize, // 立即处理
}

// ==========================================
// BatchApi - 批次 API
// ==========================================

/// 批次API
///
/// 职责：
/// 1. 批次生命周期（创建、录入、确认、删除）
/// 2. 优先级看板（评分 + 排序）
pub struct BatchApi {
    batch_repo: Arc<BatchRepository>,
    scoring_engine: Arc<ScoringEngine>,
    priority_sorter: Arc<PrioritySorter>,
}

impl BatchApi {
    /// 创建新的BatchApi实例
    pub fn new(
        batch_repo: Arc<BatchRepository>,
        scoring_engine: Arc<ScoringEngine>,
        priority_sorter: Arc<PrioritySorter>,
    ) -> Self {
        Self {
            batch_repo,
            scoring_engine,
            priority_sorter,
        }
    }

    // ==========================================
    // 写操作
    // ==========================================

    /// 创建批次
    ///
    /// 批次号格式 `STG{罐号}_{YYYY-MM-DD}_{HH:MM}`（本地时钟），显示名称 `STG {罐号}`
    ///
    /// # 参数
    /// - tank_code: 发酵罐编号（仅数字）
    /// - started_at: 开始时间
    ///
    /// # 返回
    /// - Ok(Batch): 新建批次
    /// - Err(ApiError::BusinessRuleViolation): 同一罐同一日同一分钟已存在批次
    pub fn create_batch(&self, tank_code: &str, started_at: DateTime<Utc>) -> ApiResult<Batch> {
        let tank_code = validate_tank_code(tank_code)?;

        let id = batch_id_for(&tank_code, started_at);
        let label = format!("STG {}", tank_code);
        let batch = Batch::new(id, label, tank_code, started_at);

        self.batch_repo.insert(&batch)?;

        info!(batch_id = %batch.id, tank_code = %batch.tank_code, "批次已创建");
        Ok(batch)
    }

    /// 录入一条 pH/感官测量
    ///
    /// # 返回
    /// - Ok(Batch): 追加后的批次
    /// - Err(ApiError::NotFound): 批次不存在
    /// - Err(ApiError::InvalidStateTransition): 批次已确认
    pub fn record_measurement(
        &self,
        batch_id: &str,
        ph: f64,
        sensory_flag: SensoryFlag,
        observed_at: DateTime<Utc>,
    ) -> ApiResult<Batch> {
        validate_batch_id(batch_id)?;
        validate_ph(ph)?;

        let measurement = Measurement::new(ph, sensory_flag, observed_at);
        let batch = self.batch_repo.append_measurement(batch_id, &measurement)?;

        let gate = self.scoring_engine.evaluate_hard_gate(ph, sensory_flag);
        if gate.status != GateStatus::Pass {
            warn!(batch_id = %batch_id, ph, sensory = %sensory_flag, gate = %gate.status, "测量触发硬闸门");
        }
        info!(
            batch_id = %batch_id,
            ph,
            sensory = %sensory_flag,
            count = batch.measurements.len(),
            "测量已记录"
        );
        Ok(batch)
    }

    /// 确认批次并归档
    ///
    /// 最终评分在 `now` 时刻由评分引擎计算后冻结
    ///
    /// # 返回
    /// - Ok(HistoryRecord): 归档记录
    pub fn confirm_batch(&self, batch_id: &str, now: DateTime<Utc>) -> ApiResult<HistoryRecord> {
        validate_batch_id(batch_id)?;

        let batch = self.require_batch(batch_id)?;
        if !batch.is_active() {
            return Err(ApiError::InvalidStateTransition {
                from: batch.status.to_string(),
                to: "CONFIRMED".to_string(),
            });
        }

        let result = self.scoring_engine.score(&batch, now);
        let record = self.batch_repo.confirm(batch_id, result.score, now)?;

        info!(batch_id = %batch_id, final_score = record.final_score, "批次已确认归档");
        Ok(record)
    }

    /// 删除批次（级联删除测量记录）
    pub fn delete_batch(&self, batch_id: &str) -> ApiResult<()> {
        validate_batch_id(batch_id)?;
        self.batch_repo.delete(batch_id)?;
        info!(batch_id = %batch_id, "批次已删除");
        Ok(())
    }

    // ==========================================
    // 查询
    // ==========================================

    /// 查询单个批次
    pub fn get_batch(&self, batch_id: &str) -> ApiResult<Batch> {
        validate_batch_id(batch_id)?;
        self.require_batch(batch_id)
    }

    /// 查询全部在制批次（按开始时间降序）
    pub fn list_active_batches(&self) -> ApiResult<Vec<Batch>> {
        Ok(self.batch_repo.list_active()?)
    }

    /// 在制批次数量
    pub fn count_active_batches(&self) -> ApiResult<i64> {
        Ok(self.batch_repo.count_active()?)
    }

    /// 生成优先级看板
    ///
    /// # 参数
    /// - now: 评分时刻（同一快照内所有批次共用）
    pub fn priority_board(&self, now: DateTime<Utc>) -> ApiResult<BoardSnapshot> {
        let batches = self.batch_repo.list_active()?;
        let entries = self.priority_sorter.rank(&batches, now);

        let count_gate = |status: GateStatus| {
            entries
                .iter()
                .filter(|e| e.breakdown.gate.map(|g| g.status) == Some(status))
                .count()
        };
        let hold_count = count_gate(GateStatus::Hold);
        let urgent_count = count_gate(GateStatus::Urgent);

        Ok(BoardSnapshot {
            generated_at: now,
            entries,
            hold_count,
            urgent_count,
        })
    }

    fn require_batch(&self, batch_id: &str) -> ApiResult<Batch> {
        self.batch_repo
            .find_by_id(batch_id)?
            .ok_or_else(|| ApiError::NotFound(format!("Batch(id={})不存在", batch_id)))
    }
}

/// 批次号: `STG{罐号}_{本地日期}_{时:分}`，如 `STG01_2026-03-01_08:00`
pub fn batch_id_for(tank_code: &str, started_at: DateTime<Utc>) -> String {
    format!(
        "STG{}_{}",
        tank_code,
        started_at.with_timezone(&Local).format("%Y-%m-%d_%H:%M")
    )
}
