// ==========================================
// ScoringEngine / PrioritySorter 集成测试
// ==========================================
// 测试目标: 硬闸门、FIFO、区间混合、预测混合、排序全序
// ==========================================

mod test_helpers;

use chrono::Duration;
use ferment_risk_board::domain::{GateStatus, ScoringMode};
use ferment_risk_board::engine::{PrioritySorter, ScoringEngine};
use ferment_risk_board::logging;
use std::sync::Arc;
use test_helpers::{at_minutes, batch, t0};

use ferment_risk_board::domain::SensoryFlag::{Abnormal, Normal};

// ==========================================
// 硬闸门
// ==========================================

#[test]
fn test_abnormal_sensory_holds_regardless_of_ph_and_age() {
    logging::init_test();
    let engine = ScoringEngine::new();

    for ph in [5.5, 6.2, 6.9] {
        let b = batch("01", t0(), &[(ph, Abnormal, 0)]);
        let result = engine.score(&b, t0() + Duration::hours(10));
        assert_eq!(result.score, 999.0, "ph={}", ph);
        assert_eq!(result.rank_key.slope, 1.0);
    }
}

#[test]
fn test_ph_above_upper_limit_holds() {
    let engine = ScoringEngine::new();
    let b = batch("01", t0(), &[(6.45, Normal, 0)]);
    assert_eq!(engine.score(&b, t0()).score, 999.0);

    // 6.40 本身不触发扣留
    let b = batch("01", t0(), &[(6.40, Normal, 0)]);
    assert!(engine.score(&b, t0()).score < 1.0);
}

#[test]
fn test_ph_at_reject_line_is_urgent() {
    let engine = ScoringEngine::new();
    let b = batch("01", t0(), &[(5.90, Normal, 0)]);

    let breakdown = engine.explain(&b, t0());
    assert_eq!(breakdown.mode, ScoringMode::GateOverride);
    assert_eq!(breakdown.gate.map(|g| g.status), Some(GateStatus::Urgent));
    assert_eq!(breakdown.result.score, 1.0);
    assert_eq!(breakdown.result.rank_key.slope, 1.0);
    assert_eq!(breakdown.result.rank_key.started_at, t0());
}

#[test]
fn test_only_latest_measurement_is_gated() {
    let engine = ScoringEngine::new();
    let b = batch("01", t0(), &[(6.2, Abnormal, 0), (6.2, Normal, 30)]);

    let breakdown = engine.explain(&b, at_minutes(30));
    assert_eq!(breakdown.mode, ScoringMode::Predictive);
    assert_eq!(breakdown.result.score, 0.214);
}

// ==========================================
// 连续评分
// ==========================================

#[test]
fn test_fifo_only_without_measurements() {
    let engine = ScoringEngine::new();
    let b = batch("01", t0(), &[]);

    let result = engine.score(&b, t0() + Duration::hours(3));
    assert_eq!(result.score, 0.5);
    assert_eq!(result.rank_key.slope, 0.0);

    // 超过 6 小时饱和
    assert_eq!(engine.score(&b, t0() + Duration::hours(9)).score, 1.0);
}

#[test]
fn test_single_measurement_uses_caution_blend() {
    let engine = ScoringEngine::new();
    let b = batch("01", t0(), &[(6.0, Normal, 0)]);

    let breakdown = engine.explain(&b, t0());
    assert_eq!(breakdown.mode, ScoringMode::Reactive);
    assert_eq!(breakdown.velocity_risk, None);
    assert_eq!(breakdown.result.score, 0.622);
    assert_eq!(breakdown.result.rank_key.slope, 0.0);
}

#[test]
fn test_predictive_blend_with_velocity() {
    let engine = ScoringEngine::new();
    let b = batch("01", t0(), &[(6.3, Normal, 0), (6.1, Normal, 60)]);

    let result = engine.score(&b, at_minutes(60));
    assert_eq!(result.score, 0.538);
    assert!((result.rank_key.slope - 0.8).abs() < 1e-9);
}

#[test]
fn test_duplicate_timestamps_fall_back_to_reactive() {
    let engine = ScoringEngine::new();
    let b = batch("01", t0(), &[(6.3, Normal, 10), (6.0, Normal, 10)]);

    let breakdown = engine.explain(&b, at_minutes(10));
    assert_eq!(breakdown.mode, ScoringMode::Reactive);
    assert_eq!(breakdown.velocity_risk, None);
}

#[test]
fn test_non_sentinel_scores_have_three_decimals() {
    let engine = ScoringEngine::new();
    let samples = [
        batch("01", t0(), &[(6.33, Normal, 0)]),
        batch("02", t0(), &[(6.01, Normal, 0), (5.97, Normal, 37)]),
        batch("03", t0(), &[(5.93, Normal, 0)]),
        batch("04", t0(), &[]),
    ];

    for b in &samples {
        let score = engine.score(b, at_minutes(97)).score;
        assert!((0.0..=1.0).contains(&score), "{} out of range: {}", b.id, score);
        let scaled = score * 1000.0;
        assert!((scaled - scaled.round()).abs() < 1e-6, "{} not rounded: {}", b.id, score);
    }
}

// ==========================================
// 排序
// ==========================================

#[test]
fn test_ranking_is_total_and_input_order_independent() {
    let sorter = PrioritySorter::new(Arc::new(ScoringEngine::new()));
    let now = t0() + Duration::hours(2);

    let batches = vec![
        batch("C", t0(), &[]),
        batch("A", t0(), &[]),
        batch("B", t0(), &[]),
        batch("OLD", t0() - Duration::hours(1), &[]),
        batch("HOLD", at_minutes(30), &[(6.2, Abnormal, 30)]),
        batch("URG", at_minutes(30), &[(5.8, Normal, 30)]),
    ];

    let forward: Vec<String> = sorter
        .rank(&batches, now)
        .into_iter()
        .map(|e| e.batch_id)
        .collect();

    let mut reversed_input = batches.clone();
    reversed_input.reverse();
    let backward: Vec<String> = sorter
        .rank(&reversed_input, now)
        .into_iter()
        .map(|e| e.batch_id)
        .collect();

    assert_eq!(forward, vec!["HOLD", "URG", "OLD", "A", "B", "C"]);
    assert_eq!(forward, backward);
}
