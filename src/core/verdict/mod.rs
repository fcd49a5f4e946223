//! 帧级分数 → 视频级判定
//!
//! 极性约定只在 [`Polarity::label_for`] 一处比较，所有把 confidence 变成标签的地方都走这里。

pub mod accumulator;
pub mod aggregator;

pub use accumulator::VerdictAccumulator;
pub use aggregator::VerdictAggregator;

use crate::core::error::FrameError;
use crate::core::video::FrameRecord;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Label {
    Fake,
    Authentic,
}

impl Label {
    pub fn as_str(&self) -> &'static str {
        match self {
            Label::Fake => "fake",
            Label::Authentic => "authentic",
        }
    }
}

/// 极性约定：confidence 与阈值的比较方向
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Polarity {
    /// `confidence >= threshold` → Authentic，否则 Fake
    #[default]
    AuthenticAtOrAbove,
    /// `confidence >= threshold` → Fake，否则 Authentic
    FakeAtOrAbove,
}

impl Polarity {
    pub fn label_for(&self, confidence: f32, threshold: f32) -> Label {
        let at_or_above = confidence >= threshold;
        match (self, at_or_above) {
            (Polarity::AuthenticAtOrAbove, true) | (Polarity::FakeAtOrAbove, false) => {
                Label::Authentic
            }
            (Polarity::AuthenticAtOrAbove, false) | (Polarity::FakeAtOrAbove, true) => Label::Fake,
        }
    }
}

#[derive(Debug)]
pub enum ScoreStatus {
    Scored(f32),
    Failed(FrameError),
}

/// 单帧打分结果，创建后不可变；只能通过 `scored` / `failed` 构造
#[derive(Debug)]
pub struct ScoreOutcome {
    status: ScoreStatus,
    /// 仅 `Scored` 时有值
    label: Option<Label>,
}

impl ScoreOutcome {
    pub fn scored(confidence: f32, label: Label) -> Self {
        Self {
            status: ScoreStatus::Scored(confidence),
            label: Some(label),
        }
    }

    pub fn failed(error: FrameError) -> Self {
        Self {
            status: ScoreStatus::Failed(error),
            label: None,
        }
    }

    pub fn status(&self) -> &ScoreStatus {
        &self.status
    }

    pub fn label(&self) -> Option<Label> {
        self.label
    }

    pub fn confidence(&self) -> Option<f32> {
        match self.status {
            ScoreStatus::Scored(c) => Some(c),
            ScoreStatus::Failed(_) => None,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.status, ScoreStatus::Failed(_))
    }

    pub fn failure_reason(&self) -> Option<String> {
        match &self.status {
            ScoreStatus::Failed(e) => Some(e.to_string()),
            ScoreStatus::Scored(_) => None,
        }
    }
}

/// 证据条目：哪一帧、得了什么分
#[derive(Debug)]
pub struct Evidence {
    pub frame: FrameRecord,
    pub outcome: ScoreOutcome,
}

/// 视频级判定结果
#[derive(Debug)]
pub struct Verdict {
    pub total_frames_sampled: usize,
    pub total_frames_scored: usize,
    pub scoring_errors: usize,
    pub fake_frame_count: usize,
    pub authentic_frame_count: usize,
    pub average_confidence: f64,
    pub overall_label: Label,
    /// 按抽帧顺序
    pub evidence: Vec<Evidence>,
}
