use super::{Polarity, ScoreOutcome, Verdict, VerdictAccumulator};
use crate::core::error::{AnalysisError, FrameError};
use crate::core::scoring::{validate_confidence, FrameScorer};
use crate::core::video::FrameRecord;
use log::{debug, info, warn};

pub const DEFAULT_THRESHOLD: f32 = 0.5;

/// 逐帧打分并汇总成视频级判定；单帧失败只计数，不中止
#[derive(Debug, Clone)]
pub struct VerdictAggregator {
    threshold: f32,
    polarity: Polarity,
}

impl VerdictAggregator {
    pub fn new() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            polarity: Polarity::default(),
        }
    }

    /// threshold 必须在 `[0, 1]` 内（NaN 拒绝）
    pub fn with_threshold(threshold: f32, polarity: Polarity) -> Result<Self, AnalysisError> {
        if !(0.0..=1.0).contains(&threshold) {
            return Err(AnalysisError::InvalidConfig(format!(
                "threshold must be in [0, 1], got {}",
                threshold
            )));
        }
        Ok(Self {
            threshold,
            polarity,
        })
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    pub fn polarity(&self) -> Polarity {
        self.polarity
    }

    pub fn score_frame(&self, frame: &FrameRecord, scorer: &dyn FrameScorer) -> ScoreOutcome {
        let result = scorer
            .score(&frame.locator)
            .map_err(FrameError::from)
            .and_then(validate_confidence);

        match result {
            Ok(confidence) => {
                let label = self.polarity.label_for(confidence, self.threshold);
                debug!(
                    "Analyzed {}: confidence = {}, label = {}",
                    frame.identifier,
                    confidence,
                    label.as_str()
                );
                ScoreOutcome::scored(confidence, label)
            }
            Err(e) => {
                warn!("⚠️ Scoring failed for {}: {}", frame.identifier, e);
                ScoreOutcome::failed(e)
            }
        }
    }

    pub fn aggregate(
        &self,
        frames: Vec<FrameRecord>,
        scorer: &dyn FrameScorer,
    ) -> Result<Verdict, AnalysisError> {
        self.aggregate_with(frames, scorer, |_| Ok(()))
    }

    /// `checkpoint` 在每帧打分前调用，返回 Err 时中止（用于请求 deadline）
    pub fn aggregate_with<F>(
        &self,
        frames: Vec<FrameRecord>,
        scorer: &dyn FrameScorer,
        mut checkpoint: F,
    ) -> Result<Verdict, AnalysisError>
    where
        F: FnMut(&FrameRecord) -> Result<(), AnalysisError>,
    {
        let mut accumulator = VerdictAccumulator::with_capacity(frames.len());

        for frame in frames {
            checkpoint(&frame)?;
            let outcome = self.score_frame(&frame, scorer);
            accumulator.record(frame, outcome);
        }

        info!(
            "📊 Scored {} frames with {} ({} failed)",
            accumulator.scored_count(),
            scorer.name(),
            accumulator.failed_count()
        );
        accumulator.finalize()
    }
}

impl Default for VerdictAggregator {
    fn default() -> Self {
        Self::new()
    }
}
