use super::request::{AnalysisRequest, RequestId};
use super::state::{AnalysisEvent, AnalysisState};
use crate::core::config::AnalysisConfig;
use crate::core::error::AnalysisError;
use crate::core::scoring::SharedScorer;
use crate::core::verdict::{Verdict, VerdictAggregator};
use crate::core::video::{DiskFrameStore, FrameRecord, FrameSampler};
use log::{error, info, warn};
use rayon::prelude::*;
use std::time::{Duration, Instant};

/// 一次成功分析的结果
#[derive(Debug)]
pub struct VideoAnalysis {
    pub id: RequestId,
    /// frames_root 下的请求目录名
    pub frames_dir: String,
    pub verdict: Verdict,
    pub elapsed: Duration,
}

/// 抽帧 → 打分 → 汇总。分类器句柄只读共享，每个请求各自的帧目录
pub struct VideoAnalyzer {
    config: AnalysisConfig,
    scorer: SharedScorer,
    sampler: FrameSampler,
    aggregator: VerdictAggregator,
}

impl VideoAnalyzer {
    pub fn new(config: AnalysisConfig, scorer: SharedScorer) -> Result<Self, AnalysisError> {
        config.validate()?;
        Ok(Self {
            sampler: FrameSampler::with_stride(config.stride),
            aggregator: VerdictAggregator::with_threshold(config.threshold, config.polarity)?,
            config,
            scorer,
        })
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    pub fn analyze(&self, request: AnalysisRequest) -> Result<VideoAnalysis, AnalysisError> {
        let started = Instant::now();
        let deadline = self.config.deadline();
        let AnalysisRequest { id, mut source } = request;
        let frames_dir = id.frames_dir_name();
        let mut state = AnalysisState::new();

        info!("🔎 [{}] Analyzing {}", id, source.describe());

        let sampled: Result<Vec<FrameRecord>, AnalysisError> = DiskFrameStore::create(
            &self.config.frames_root,
            frames_dir.as_str(),
            self.config.jpeg_quality,
        )
        .map_err(AnalysisError::from)
        .and_then(|mut store| {
            self.sampler.sample_with(&mut *source, &mut store, |_| {
                check_deadline(started, deadline, "sampling")
            })
        })
        .and_then(|frames| {
            check_deadline(started, deadline, "sampling")?;
            Ok(frames)
        });

        let frames = match sampled {
            Ok(frames) => {
                state = state.transition(AnalysisEvent::SamplingDone {
                    sampled: frames.len(),
                });
                frames
            }
            Err(e) => {
                let event = match e {
                    AnalysisError::DeadlineExceeded { .. } => AnalysisEvent::DeadlineExceeded,
                    _ => AnalysisEvent::SamplingFailed,
                };
                state = state.transition(event);
                error!("❌ [{}] {} : {}", id, state.name(), e);
                return Err(e);
            }
        };

        let sampled_count = frames.len();
        let result = self
            .aggregator
            .aggregate_with(frames, self.scorer.as_ref(), |_| {
                check_deadline(started, deadline, "scoring")
            })
            .and_then(|verdict| {
                // 最后一帧打分也可能越过 deadline
                check_deadline(started, deadline, "scoring")?;
                Ok(verdict)
            });

        state = state.transition(match &result {
            Ok(verdict) => AnalysisEvent::ScoringDone {
                sampled: sampled_count,
                scored: verdict.total_frames_scored,
            },
            Err(AnalysisError::DeadlineExceeded { .. }) => AnalysisEvent::DeadlineExceeded,
            Err(_) => AnalysisEvent::ScoringDone {
                sampled: sampled_count,
                scored: 0,
            },
        });

        let elapsed = started.elapsed();
        match result {
            Ok(verdict) => {
                info!(
                    "✅ [{}] {}: {} ({}/{} frames fake, avg confidence {:.4}) in {:?}",
                    id,
                    state.name(),
                    verdict.overall_label.as_str(),
                    verdict.fake_frame_count,
                    verdict.total_frames_scored,
                    verdict.average_confidence,
                    elapsed
                );
                Ok(VideoAnalysis {
                    id,
                    frames_dir,
                    verdict,
                    elapsed,
                })
            }
            Err(e) => {
                warn!("⚠️ [{}] {}: {}", id, state.name(), e);
                Err(e)
            }
        }
    }

    /// 每个请求占一个 worker，结果按输入顺序返回
    pub fn analyze_batch(
        &self,
        requests: Vec<AnalysisRequest>,
    ) -> Result<Vec<Result<VideoAnalysis, AnalysisError>>, AnalysisError> {
        let workers = self.config.worker_count().min(requests.len().max(1));
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("frame-verdict-{}", i))
            .build()
            .map_err(|e| AnalysisError::WorkerPool(e.to_string()))?;

        info!(
            "🧵 Analyzing batch of {} videos on {} workers",
            requests.len(),
            workers
        );
        Ok(pool.install(|| {
            requests
                .into_par_iter()
                .map(|request| self.analyze(request))
                .collect()
        }))
    }
}

fn check_deadline(
    started: Instant,
    deadline: Option<Duration>,
    stage: &'static str,
) -> Result<(), AnalysisError> {
    match deadline {
        Some(limit) if started.elapsed() > limit => Err(AnalysisError::DeadlineExceeded {
            elapsed_ms: started.elapsed().as_millis() as u64,
            stage,
        }),
        _ => Ok(()),
    }
}
