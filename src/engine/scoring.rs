// ==========================================
// 发酵批次风险排序系统 - 风险评分引擎
// ==========================================
// 职责: 由批次等待时长与 pH/感官序列计算优先级评分与排序键
// 输入: 批次快照 + 当前时刻
// 输出: ScoringResult (score + rank_key) / ScoreBreakdown (可解释明细)
// ==========================================
// 红线: 硬闸门先于一切连续评分
// 红线: 纯函数，无 I/O，now 由调用方传入
// ==========================================

use crate::domain::batch::{Batch, Measurement};
use crate::domain::score::{GateDecision, RankKey, ScoreBreakdown, ScoringResult};
use crate::domain::types::{GateStatus, RiskZone, ScoringMode, SensoryFlag};
use chrono::{DateTime, Utc};

// ==========================================
// 阈值常量
// ==========================================

/// pH 上限（高于此值说明发酵未启动或异常，扣留）
pub const PH_UPPER_LIMIT: f64 = 6.40;
/// 安全区下界
pub const PH_SAFE_ZONE: f64 = 6.05;
/// 警戒线
pub const PH_CAUTION_LIMIT: f64 = 5.95;
/// 拒收线（小于等于此值立即处理）
pub const PH_REJECT_LIMIT: f64 = 5.90;

/// 等待时长饱和点（小时）
pub const AGE_HORIZON_HOURS: f64 = 6.0;
/// pH 下降速率归一化上限（每小时）
pub const MAX_PH_SLOPE: f64 = 0.25;

/// HOLD 哨兵评分：移出正常排序，需人工复核
pub const HOLD_SCORE: f64 = 999.0;
/// URGENT 评分：最高优先级
pub const URGENT_SCORE: f64 = 1.0;

const MILLIS_PER_HOUR: f64 = 3_600_000.0;

// ==========================================
// ScoringEngine - 风险评分引擎
// ==========================================
pub struct ScoringEngine {
    // 无状态引擎,不需要注入依赖
}

impl Default for ScoringEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl ScoringEngine {
    /// 构造函数
    pub fn new() -> Self {
        Self {}
    }

    // ==========================================
    // 核心方法
    // ==========================================

    /// 计算批次评分与排序键
    ///
    /// # 参数
    /// - `batch`: 批次快照（测量记录按 observed_at 升序）
    /// - `now`: 当前时刻
    ///
    /// # 返回
    /// ScoringResult
    pub fn score(&self, batch: &Batch, now: DateTime<Utc>) -> ScoringResult {
        self.explain(batch, now).result
    }

    /// 计算批次评分并给出明细
    ///
    /// 步骤:
    /// 1) 等待时长严重度
    /// 2) 无测量记录 → 纯 FIFO
    /// 3) 最新测量过硬闸门; 非 PASS 直接覆盖
    /// 4) PASS → 区间混合当前风险; 有速度信号时与预测风险各占一半
    pub fn explain(&self, batch: &Batch, now: DateTime<Utc>) -> ScoreBreakdown {
        // 1. 等待时长
        let age_sev = self.age_severity(batch.started_at, now);

        // 2. 无 pH 记录 → FIFO
        let last = match batch.last_measurement() {
            Some(m) => m,
            None => {
                return ScoreBreakdown {
                    mode: ScoringMode::FifoOnly,
                    gate: None,
                    zone: None,
                    age_severity: age_sev,
                    ph_severity: None,
                    velocity_risk: None,
                    current_risk: None,
                    predictive_risk: None,
                    result: ScoringResult {
                        score: round_score(age_sev),
                        rank_key: RankKey {
                            started_at: batch.started_at,
                            slope: 0.0,
                        },
                    },
                    reason: "无pH记录,按等待时长排序".to_string(),
                };
            }
        };

        // 3. 硬闸门
        let gate = self.evaluate_hard_gate(last.ph, last.sensory_flag);
        if let Some(gate_score) = gate.score {
            let reason = match (gate.status, last.sensory_flag) {
                (GateStatus::Hold, SensoryFlag::Abnormal) => "感官异常,扣留待人工复核".to_string(),
                (GateStatus::Hold, _) => format!("pH={} 高于上限{},扣留待人工复核", last.ph, PH_UPPER_LIMIT),
                _ => format!("pH={} 已达拒收线{},立即处理", last.ph, PH_REJECT_LIMIT),
            };
            tracing::debug!(batch_id = %batch.id, gate = %gate.status, "硬闸门覆盖评分");

            return ScoreBreakdown {
                mode: ScoringMode::GateOverride,
                gate: Some(gate),
                zone: None,
                age_severity: age_sev,
                ph_severity: None,
                velocity_risk: None,
                current_risk: None,
                predictive_risk: None,
                result: ScoringResult {
                    score: gate_score,
                    rank_key: RankKey {
                        started_at: batch.started_at,
                        slope: 1.0,
                    },
                },
                reason,
            };
        }

        // 4. 连续评分
        let zone = self.classify_zone(last.ph);
        let ph_sev = self.ph_severity(last.ph);
        let curr_risk = self.current_risk(last.ph, age_sev);
        let vel_risk = self.velocity_risk(&batch.measurements);

        let (mode, pred_risk, final_score) = match vel_risk {
            // 反应模式
            None => (ScoringMode::Reactive, None, curr_risk),
            Some(vel) => {
                let pred = self.predictive_risk(ph_sev, age_sev, vel);
                (ScoringMode::Predictive, Some(pred), 0.5 * curr_risk + 0.5 * pred)
            }
        };

        let score = round_score(final_score);
        tracing::debug!(batch_id = %batch.id, score, mode = %mode, zone = %zone, "批次评分完成");

        ScoreBreakdown {
            mode,
            gate: Some(gate),
            zone: Some(zone),
            age_severity: age_sev,
            ph_severity: Some(ph_sev),
            velocity_risk: vel_risk,
            current_risk: Some(curr_risk),
            predictive_risk: pred_risk,
            result: ScoringResult {
                score,
                rank_key: RankKey {
                    started_at: batch.started_at,
                    slope: vel_risk.unwrap_or(0.0),
                },
            },
            reason: format!("pH={} 处于{}区,{}模式", last.ph, zone, mode),
        }
    }

    // ==========================================
    // 硬闸门
    // ==========================================

    /// 硬闸门判定
    ///
    /// 规则 (按顺序):
    /// - 感官异常 → HOLD (999)
    /// - ph > 6.40 → HOLD (999)
    /// - ph <= 5.90 → URGENT (1.0)
    /// - 其他 → PASS
    pub fn evaluate_hard_gate(&self, ph: f64, sensory_flag: SensoryFlag) -> GateDecision {
        if sensory_flag == SensoryFlag::Abnormal {
            return GateDecision {
                status: GateStatus::Hold,
                score: Some(HOLD_SCORE),
            };
        }

        if ph > PH_UPPER_LIMIT {
            return GateDecision {
                status: GateStatus::Hold,
                score: Some(HOLD_SCORE),
            };
        }

        if ph <= PH_REJECT_LIMIT {
            return GateDecision {
                status: GateStatus::Urgent,
                score: Some(URGENT_SCORE),
            };
        }

        GateDecision {
            status: GateStatus::Pass,
            score: None,
        }
    }

    // ==========================================
    // 归一化分量
    // ==========================================

    /// 等待时长严重度: 6 小时线性饱和到 1.0
    pub fn age_severity(&self, started_at: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
        let age_hours = (now - started_at).num_milliseconds() as f64 / MILLIS_PER_HOUR;
        clamp_unit(age_hours / AGE_HORIZON_HOURS)
    }

    /// pH 严重度: 6.40 及以上为 0，5.95 及以下为 1
    pub fn ph_severity(&self, ph: f64) -> f64 {
        clamp_unit((PH_UPPER_LIMIT - ph) / (PH_UPPER_LIMIT - PH_CAUTION_LIMIT))
    }

    /// 速度风险: 最近两条记录的 pH 变化率
    ///
    /// # 返回
    /// - None: 记录少于 2 条，或时间差 <= 0（时钟偏移/重复时间戳）
    /// - Some(v): |Δph/Δh| / 0.25，截断到 [0,1]
    pub fn velocity_risk(&self, measurements: &[Measurement]) -> Option<f64> {
        let [.., prev, last] = measurements else {
            return None;
        };

        let dt_hours = (last.observed_at - prev.observed_at).num_milliseconds() as f64
            / MILLIS_PER_HOUR;
        if dt_hours <= 0.0 {
            return None;
        }

        let slope = (last.ph - prev.ph) / dt_hours;
        Some(clamp_unit(slope.abs() / MAX_PH_SLOPE))
    }

    // ==========================================
    // 区间混合
    // ==========================================

    /// 判定 pH 区间（严格大于比较，边界值落入下一区间）
    pub fn classify_zone(&self, ph: f64) -> RiskZone {
        if ph > PH_SAFE_ZONE {
            RiskZone::Safe
        } else if ph > PH_CAUTION_LIMIT {
            RiskZone::Caution
        } else {
            RiskZone::Critical
        }
    }

    /// 当前风险 (区间混合)
    ///
    /// - SAFE: 0.6·age + 0.4·(距上限相对安全区的归一化距离)
    /// - CAUTION: 0.7·ph_sev + 0.3·age
    /// - CRITICAL: 0.8·ph_sev + 0.2·age
    pub fn current_risk(&self, ph: f64, age_sev: f64) -> f64 {
        match self.classify_zone(ph) {
            RiskZone::Safe => {
                let ph_safe = clamp_unit((PH_UPPER_LIMIT - ph) / (PH_UPPER_LIMIT - PH_SAFE_ZONE));
                0.6 * age_sev + 0.4 * ph_safe
            }
            RiskZone::Caution => 0.7 * self.ph_severity(ph) + 0.3 * age_sev,
            RiskZone::Critical => 0.8 * self.ph_severity(ph) + 0.2 * age_sev,
        }
    }

    /// 预测风险（仅在有速度信号时计算）
    pub fn predictive_risk(&self, ph_sev: f64, age_sev: f64, vel_risk: f64) -> f64 {
        0.5 * vel_risk + 0.3 * ph_sev + 0.2 * age_sev
    }
}

// ==========================================
// 工具函数
// ==========================================

fn clamp_unit(value: f64) -> f64 {
    value.clamp(0.0, 1.0)
}

/// 评分保留 3 位小数
pub fn round_score(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}
