use super::FrameScorer;
use crate::core::error::ScoreError;
use crate::core::video::store::parse_frame_index;
use std::collections::HashMap;

type ScoreFn = Box<dyn Fn(u64) -> Result<f32, ScoreError> + Send + Sync>;

/// 按帧号返回预设分数的打分器，用于测试和宿主集成自检
pub struct MockScorer {
    score_fn: Option<ScoreFn>,
}

impl MockScorer {
    pub fn new() -> Self {
        Self { score_fn: None }
    }

    pub fn with_pattern<F>(pattern: F) -> Self
    where
        F: Fn(u64) -> Result<f32, ScoreError> + Send + Sync + 'static,
    {
        Self {
            score_fn: Some(Box::new(pattern)),
        }
    }

    /// 没列出的帧号当作分类器不可用
    pub fn with_fixed_scores(scores: Vec<(u64, f32)>) -> Self {
        let scores: HashMap<u64, f32> = scores.into_iter().collect();
        Self::with_pattern(move |index| {
            scores
                .get(&index)
                .copied()
                .ok_or_else(|| ScoreError::Unavailable(format!("no score for frame {}", index)))
        })
    }

    pub fn constant(confidence: f32) -> Self {
        Self::with_pattern(move |_| Ok(confidence))
    }
}

impl Default for MockScorer {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameScorer for MockScorer {
    fn score(&self, locator: &str) -> Result<f32, ScoreError> {
        let index = parse_frame_index(locator)
            .ok_or_else(|| ScoreError::InvalidInput(format!("not a frame locator: {}", locator)))?;

        match &self.score_fn {
            Some(f) => f(index),
            None => Err(ScoreError::Unavailable("mock scorer has no pattern".into())),
        }
    }

    fn name(&self) -> &str {
        "mock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn test_fixed_scores_by_frame_index() {
        let scorer = MockScorer::with_fixed_scores(vec![(0, 0.9), (20, 0.3)]);
        assert_eq!(scorer.score("/frames/req/frame0.jpg").unwrap(), 0.9);
        assert_eq!(scorer.score("/frames/req/frame20.jpg").unwrap(), 0.3);
        assert_matches!(
            scorer.score("/frames/req/frame40.jpg"),
            Err(ScoreError::Unavailable(_))
        );
    }

    #[test]
    fn test_rejects_non_frame_locator() {
        let scorer = MockScorer::constant(0.5);
        assert_matches!(
            scorer.score("/frames/req/thumbnail.png"),
            Err(ScoreError::InvalidInput(_))
        );
    }

    #[test]
    fn test_default_is_unavailable() {
        let scorer = MockScorer::default();
        assert_matches!(
            scorer.score("frame0.jpg"),
            Err(ScoreError::Unavailable(_))
        );
    }
}
