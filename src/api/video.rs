//! 视频真伪分析服务

use crate::api::models::report::AnalysisReport;
use crate::core::analysis::{AnalysisRequest, VideoAnalyzer};
use crate::core::config::AnalysisConfig;
use crate::core::error::{AnalysisError, StorageError};
use crate::core::scoring::SharedScorer;
use crate::core::video::{DiskFrameStore, FfmpegSource, VideoSource};
use log::info;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// 对外错误类型，宿主/HTTP 层友好的扁平结构
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisApiError {
    pub error_type: String,
    pub message: String,
}

impl From<AnalysisError> for AnalysisApiError {
    fn from(e: AnalysisError) -> Self {
        Self {
            error_type: e.kind().to_string(),
            message: e.to_string(),
        }
    }
}

impl From<StorageError> for AnalysisApiError {
    fn from(e: StorageError) -> Self {
        AnalysisError::from(e).into()
    }
}

impl std::fmt::Display for AnalysisApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.error_type, self.message)
    }
}

impl std::error::Error for AnalysisApiError {}

/// 视频真伪分析服务 - 抽帧 + 外部分类器打分 + 多数表决
///
/// ```ignore
/// let scorer: SharedScorer = Arc::new(CommandScorer::new("python3").with_args(["score_frame.py"]));
/// let service = VideoVerdictService::create(AnalysisConfig::default(), scorer)?;
/// let report = service.analyze_file("uploads/clip.mp4".to_string())?;
/// println!("{}", report.to_json()?);
/// ```
pub struct VideoVerdictService {
    analyzer: VideoAnalyzer,
}

impl VideoVerdictService {
    /// 分类器句柄由调用方加载一次后传入，所有请求共享
    pub fn create(config: AnalysisConfig, scorer: SharedScorer) -> Result<Self, AnalysisApiError> {
        crate::init_logging();
        info!(
            "🎬 VideoVerdictService: stride={}, threshold={}, polarity={:?}",
            config.stride, config.threshold, config.polarity
        );
        Ok(Self {
            analyzer: VideoAnalyzer::new(config, scorer)?,
        })
    }

    /// json5 配置文件 + 环境变量覆盖
    pub fn from_config_file(
        path: impl AsRef<Path>,
        scorer: SharedScorer,
    ) -> Result<Self, AnalysisApiError> {
        let config = AnalysisConfig::load(path)?.with_env_overrides();
        Self::create(config, scorer)
    }

    pub fn config(&self) -> &AnalysisConfig {
        self.analyzer.config()
    }

    /// 分析一个视频文件（ffmpeg 解码）
    pub fn analyze_file(&self, path: String) -> Result<AnalysisReport, AnalysisApiError> {
        self.analyze_source(Box::new(FfmpegSource::new(path)))
    }

    pub fn analyze_source(
        &self,
        source: Box<dyn VideoSource>,
    ) -> Result<AnalysisReport, AnalysisApiError> {
        let analysis = self.analyzer.analyze(AnalysisRequest::new(source))?;
        Ok(AnalysisReport::from_analysis(
            &analysis,
            &self.config().public_prefix,
        ))
    }

    /// 批量分析，结果和输入一一对应
    pub fn analyze_batch(
        &self,
        paths: Vec<String>,
    ) -> Result<Vec<Result<AnalysisReport, AnalysisApiError>>, AnalysisApiError> {
        let requests = paths
            .into_iter()
            .map(|p| AnalysisRequest::new(Box::new(FfmpegSource::new(p))))
            .collect();
        self.analyze_requests(requests)
    }

    pub fn analyze_requests(
        &self,
        requests: Vec<AnalysisRequest>,
    ) -> Result<Vec<Result<AnalysisReport, AnalysisApiError>>, AnalysisApiError> {
        let prefix = &self.config().public_prefix;
        let results = self.analyzer.analyze_batch(requests)?;
        Ok(results
            .into_iter()
            .map(|r| {
                r.map(|analysis| AnalysisReport::from_analysis(&analysis, prefix))
                    .map_err(AnalysisApiError::from)
            })
            .collect())
    }

    /// 帧图片 URL → 磁盘路径，给静态文件服务用
    pub fn resolve_frame(&self, url: &str) -> Result<PathBuf, AnalysisApiError> {
        let config = self.config();
        Ok(DiskFrameStore::resolve_public_path(
            &config.frames_root,
            &config.public_prefix,
            url,
        )?)
    }
}

impl Drop for VideoVerdictService {
    fn drop(&mut self) {
        info!("🗑️ VideoVerdictService: released");
    }
}
