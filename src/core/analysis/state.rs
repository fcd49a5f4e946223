#[derive(Debug, Clone, PartialEq)]
pub enum AnalysisState {
    Sampling,
    Scoring { sampled: usize },
    Finalized { scored: usize },
    NoFramesScored { sampled: usize },
    SamplerFailed,
    TimedOut,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AnalysisEvent {
    SamplingDone { sampled: usize },
    SamplingFailed,
    ScoringDone { sampled: usize, scored: usize },
    DeadlineExceeded,
}

impl AnalysisState {
    pub fn new() -> Self {
        AnalysisState::Sampling
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, AnalysisState::Sampling | AnalysisState::Scoring { .. })
    }

    pub fn name(&self) -> &'static str {
        match self {
            AnalysisState::Sampling => "sampling",
            AnalysisState::Scoring { .. } => "scoring",
            AnalysisState::Finalized { .. } => "finalized",
            AnalysisState::NoFramesScored { .. } => "no_frames_scored",
            AnalysisState::SamplerFailed => "sampler_failed",
            AnalysisState::TimedOut => "timed_out",
        }
    }

    /// 非法事件不改变状态；终态不再迁移
    pub fn transition(&self, event: AnalysisEvent) -> AnalysisState {
        match (self, event) {
            (AnalysisState::Sampling, AnalysisEvent::SamplingDone { sampled }) => {
                AnalysisState::Scoring { sampled }
            }
            (AnalysisState::Sampling, AnalysisEvent::SamplingFailed) => {
                AnalysisState::SamplerFailed
            }
            (AnalysisState::Scoring { .. }, AnalysisEvent::ScoringDone { sampled, scored }) => {
                if scored == 0 {
                    AnalysisState::NoFramesScored { sampled }
                } else {
                    AnalysisState::Finalized { scored }
                }
            }
            (
                AnalysisState::Sampling | AnalysisState::Scoring { .. },
                AnalysisEvent::DeadlineExceeded,
            ) => AnalysisState::TimedOut,
            (state, _) => state.clone(),
        }
    }
}

impl Default for AnalysisState {
    fn default() -> Self {
        Self::new()
    }
}
