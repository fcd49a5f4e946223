use super::frame::FrameRecord;
use super::source::VideoSource;
use super::store::FrameStore;
use crate::core::error::AnalysisError;
use log::{debug, info, warn};

pub const DEFAULT_STRIDE: u64 = 20;

/// 固定步长抽帧：解码计数 `counter % stride == 0` 的帧被保留
///
/// 纯位置步长，和时间戳/FPS 无关。
pub struct FrameSampler {
    stride: u64,
}

impl FrameSampler {
    pub fn new() -> Self {
        Self::with_stride(DEFAULT_STRIDE)
    }

    /// stride 为 0 时按 1 处理
    pub fn with_stride(stride: u64) -> Self {
        Self {
            stride: stride.max(1),
        }
    }

    pub fn stride(&self) -> u64 {
        self.stride
    }

    pub fn should_sample(&self, counter: u64) -> bool {
        counter % self.stride == 0
    }

    /// `ceil(frame_count / stride)`
    pub fn expected_sample_count(&self, frame_count: u64) -> u64 {
        frame_count.div_ceil(self.stride)
    }

    pub fn sample(
        &self,
        source: &mut dyn VideoSource,
        store: &mut dyn FrameStore,
    ) -> Result<Vec<FrameRecord>, AnalysisError> {
        self.sample_with(source, store, |_| Ok(()))
    }

    /// `checkpoint` 在每次解码前调用，返回 Err 时中止（用于请求 deadline）
    pub fn sample_with<F>(
        &self,
        source: &mut dyn VideoSource,
        store: &mut dyn FrameStore,
        mut checkpoint: F,
    ) -> Result<Vec<FrameRecord>, AnalysisError>
    where
        F: FnMut(u64) -> Result<(), AnalysisError>,
    {
        source.open()?;

        let mut records = Vec::new();
        let mut counter: u64 = 0;

        loop {
            checkpoint(counter)?;

            let frame = match source.next_frame() {
                Ok(Some(frame)) => frame,
                Ok(None) => break,
                Err(e) => {
                    // 解码失败等同流结束，保留已抽到的帧
                    warn!(
                        "⚠️ Decode stopped at frame {} of {}: {}",
                        counter,
                        source.describe(),
                        e
                    );
                    break;
                }
            };

            if self.should_sample(counter) {
                let record = store.persist(counter, &frame)?;
                debug!("💾 Saved frame: {}", record.locator);
                records.push(record);
            }
            counter += 1;
        }

        info!(
            "🎞️ Sampled {} of {} decoded frames from {} (stride {})",
            records.len(),
            counter,
            source.describe(),
            self.stride
        );
        Ok(records)
    }
}

impl Default for FrameSampler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::StorageError;
    use crate::core::video::frame::DecodedFrame;
    use crate::core::video::source::InMemorySource;
    use assert_matches::assert_matches;

    /// 只记录 index，不写盘
    #[derive(Default)]
    struct RecordingStore {
        persisted: Vec<u64>,
        fail_at: Option<u64>,
    }

    impl FrameStore for RecordingStore {
        fn persist(
            &mut self,
            index: u64,
            _frame: &DecodedFrame,
        ) -> Result<FrameRecord, StorageError> {
            if self.fail_at == Some(index) {
                return Err(StorageError::Io(std::io::Error::other("disk full")));
            }
            self.persisted.push(index);
            Ok(FrameRecord::new(index, self.locator_for(index)))
        }

        fn locator_for(&self, index: u64) -> String {
            format!("mem://frame{}.jpg", index)
        }
    }

    fn indices(records: &[FrameRecord]) -> Vec<u64> {
        records.iter().map(|r| r.index).collect()
    }

    #[test]
    fn test_stride_20_over_45_frames() {
        let sampler = FrameSampler::new();
        let mut source = InMemorySource::solid("clip", 45);
        let mut store = RecordingStore::default();

        let records = sampler.sample(&mut source, &mut store).unwrap();
        assert_eq!(indices(&records), vec![0, 20, 40]);
        assert_eq!(store.persisted, vec![0, 20, 40]);
        assert_eq!(records[2].identifier, "frame40");
    }

    #[test]
    fn test_sample_count_is_ceil() {
        for stride in 1..=7u64 {
            for n in 0..=30usize {
                let sampler = FrameSampler::with_stride(stride);
                let mut source = InMemorySource::solid("clip", n);
                let mut store = RecordingStore::default();
                let records = sampler.sample(&mut source, &mut store).unwrap();

                assert_eq!(records.len() as u64, sampler.expected_sample_count(n as u64));
                let expected: Vec<u64> = (0..n as u64).step_by(stride as usize).collect();
                assert_eq!(indices(&records), expected);
            }
        }
    }

    #[test]
    fn test_empty_video_is_not_an_error() {
        let sampler = FrameSampler::new();
        let mut source = InMemorySource::solid("empty", 0);
        let records = sampler
            .sample(&mut source, &mut RecordingStore::default())
            .unwrap();
        assert!(records.is_empty());
    }

    #[test]
    fn test_decode_failure_keeps_earlier_frames() {
        let sampler = FrameSampler::with_stride(10);
        let mut source = InMemorySource::solid("clip", 50).with_decode_failure_at(25);
        let records = sampler
            .sample(&mut source, &mut RecordingStore::default())
            .unwrap();
        assert_eq!(indices(&records), vec![0, 10, 20]);
    }

    #[test]
    fn test_unreadable_source_is_fatal() {
        let sampler = FrameSampler::new();
        let mut source = InMemorySource::unreadable("broken.mp4", "not a video");
        assert_matches!(
            sampler.sample(&mut source, &mut RecordingStore::default()),
            Err(AnalysisError::SourceUnreadable { .. })
        );
    }

    #[test]
    fn test_storage_failure_is_fatal() {
        let sampler = FrameSampler::with_stride(5);
        let mut source = InMemorySource::solid("clip", 20);
        let mut store = RecordingStore {
            fail_at: Some(10),
            ..Default::default()
        };
        assert_matches!(
            sampler.sample(&mut source, &mut store),
            Err(AnalysisError::Storage(_))
        );
        assert_eq!(store.persisted, vec![0, 5]);
    }

    #[test]
    fn test_zero_stride_clamped() {
        let sampler = FrameSampler::with_stride(0);
        assert_eq!(sampler.stride(), 1);
        assert_eq!(sampler.expected_sample_count(3), 3);
    }

    #[test]
    fn test_checkpoint_aborts() {
        let sampler = FrameSampler::with_stride(2);
        let mut source = InMemorySource::solid("clip", 10);
        let result = sampler.sample_with(&mut source, &mut RecordingStore::default(), |counter| {
            if counter >= 4 {
                Err(AnalysisError::DeadlineExceeded {
                    elapsed_ms: 1,
                    stage: "sampling",
                })
            } else {
                Ok(())
            }
        });
        assert_matches!(result, Err(AnalysisError::DeadlineExceeded { .. }));
    }
}
