//! 分类器打分契约
//!
//! 分类器本身（模型结构、框架）不在本库内，只通过 [`FrameScorer`] 接入：
//! 给一帧已落盘图片的 locator，返回 `[0,1]` 的 confidence。

pub mod command;
pub mod mock;

pub use command::CommandScorer;
pub use mock::MockScorer;

use crate::core::error::{FrameError, ScoreError};
use std::sync::Arc;

pub trait FrameScorer: Send + Sync {
    fn score(&self, locator: &str) -> Result<f32, ScoreError>;

    fn name(&self) -> &str {
        "scorer"
    }
}

/// 只加载一次、跨请求只读共享的分类器句柄
pub type SharedScorer = Arc<dyn FrameScorer>;

/// NaN 或越界的 confidence 视为打分失败
pub fn validate_confidence(confidence: f32) -> Result<f32, FrameError> {
    if confidence.is_nan() || !(0.0..=1.0).contains(&confidence) {
        return Err(FrameError::InvalidConfidence(confidence));
    }
    Ok(confidence)
}
