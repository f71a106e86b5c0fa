// ==========================================
// 发酵批次风险排序系统 - 输入校验器
// ==========================================
// 职责: 批次创建、测量录入的字段校验
// 说明: 评分引擎不做校验，所有输入在此拦截
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use crate::domain::types::SensoryFlag;

/// 发酵罐编号最大长度
pub const MAX_TANK_CODE_LEN: usize = 8;

/// pH 物理取值范围
pub const PH_MIN: f64 = 0.0;
pub const PH_MAX: f64 = 14.0;

/// 校验发酵罐编号
///
/// # 返回
/// - Ok(String): 去除首尾空白后的编号
/// - Err(ValidationError): 为空、过长或含非数字字符
pub fn validate_tank_code(tank_code: &str) -> ApiResult<String> {
    let trimmed = tank_code.trim();
    if trimmed.is_empty() {
        return Err(ApiError::ValidationError("发酵罐编号不能为空".to_string()));
    }
    if trimmed.len() > MAX_TANK_CODE_LEN {
        return Err(ApiError::ValidationError(format!(
            "发酵罐编号过长(>{}): {}",
            MAX_TANK_CODE_LEN, trimmed
        )));
    }
    if !trimmed.chars().all(|c| c.is_ascii_digit()) {
        return Err(ApiError::ValidationError(format!(
            "发酵罐编号只能包含数字: {}",
            trimmed
        )));
    }
    Ok(trimmed.to_string())
}

/// 校验批次号
pub fn validate_batch_id(batch_id: &str) -> ApiResult<()> {
    if batch_id.trim().is_empty() {
        return Err(ApiError::InvalidInput("批次号不能为空".to_string()));
    }
    Ok(())
}

/// 校验 pH 值（有限实数且在 0~14）
pub fn validate_ph(ph: f64) -> ApiResult<()> {
    if !ph.is_finite() {
        return Err(ApiError::ValidationError(format!("pH 必须为有限实数: {}", ph)));
    }
    if !(PH_MIN..=PH_MAX).contains(&ph) {
        return Err(ApiError::ValidationError(format!(
            "pH 超出范围[{}, {}]: {}",
            PH_MIN, PH_MAX, ph
        )));
    }
    Ok(())
}

/// 解析感官标记
pub fn parse_sensory_flag(raw: &str) -> ApiResult<SensoryFlag> {
    SensoryFlag::parse(raw).ok_or_else(|| {
        ApiError::ValidationError(format!("感官标记只能为 NORMAL 或 ABNORMAL: {}", raw))
    })
}
