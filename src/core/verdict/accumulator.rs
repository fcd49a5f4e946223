use super::{Evidence, Label, ScoreOutcome, ScoreStatus, Verdict};
use crate::core::error::AnalysisError;
use crate::core::video::FrameRecord;

/// 每个请求一个累加器，每帧更新一次，最后 finalize 成 [`Verdict`]
#[derive(Debug, Default)]
pub struct VerdictAccumulator {
    scored_count: usize,
    failed_count: usize,
    fake_count: usize,
    authentic_count: usize,
    confidence_sum: f64,
    evidence: Vec<Evidence>,
}

impl VerdictAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(frames: usize) -> Self {
        Self {
            evidence: Vec::with_capacity(frames),
            ..Self::default()
        }
    }

    pub fn record(&mut self, frame: FrameRecord, outcome: ScoreOutcome) {
        match (outcome.status(), outcome.label()) {
            (ScoreStatus::Scored(confidence), Some(label)) => {
                self.scored_count += 1;
                self.confidence_sum += f64::from(*confidence);
                match label {
                    Label::Fake => self.fake_count += 1,
                    Label::Authentic => self.authentic_count += 1,
                }
            }
            _ => self.failed_count += 1,
        }
        self.evidence.push(Evidence { frame, outcome });
    }

    pub fn scored_count(&self) -> usize {
        self.scored_count
    }

    pub fn failed_count(&self) -> usize {
        self.failed_count
    }

    pub fn sampled_count(&self) -> usize {
        self.evidence.len()
    }

    /// 一帧都没打上分 → `NoFramesScored`，不会伪造一个 0 分的 Verdict
    pub fn finalize(self) -> Result<Verdict, AnalysisError> {
        if self.scored_count == 0 {
            return Err(AnalysisError::NoFramesScored {
                sampled: self.evidence.len(),
                failed: self.failed_count,
            });
        }

        // 严格多数才判 Fake，平票判 Authentic
        let overall_label = if self.fake_count > self.authentic_count {
            Label::Fake
        } else {
            Label::Authentic
        };

        Ok(Verdict {
            total_frames_sampled: self.evidence.len(),
            total_frames_scored: self.scored_count,
            scoring_errors: self.failed_count,
            fake_frame_count: self.fake_count,
            authentic_frame_count: self.authentic_count,
            average_confidence: self.confidence_sum / self.scored_count as f64,
            overall_label,
            evidence: self.evidence,
        })
    }
}
