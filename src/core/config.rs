//! 分析配置：默认值 → json5 文件 → 环境变量覆盖

use crate::core::error::AnalysisError;
use crate::core::verdict::aggregator::DEFAULT_THRESHOLD;
use crate::core::verdict::Polarity;
use crate::core::video::DEFAULT_STRIDE;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

const DEFAULT_JPEG_QUALITY: u8 = 90;
const DEFAULT_DEADLINE_MS: u64 = 300_000;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AnalysisConfig {
    pub stride: u64,
    pub threshold: f32,
    pub polarity: Polarity,
    pub frames_root: PathBuf,
    pub public_prefix: String,
    pub jpeg_quality: u8,
    /// None 表示不限时
    pub deadline_ms: Option<u64>,
    /// None 表示按 CPU 核数
    pub max_workers: Option<usize>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            stride: DEFAULT_STRIDE,
            threshold: DEFAULT_THRESHOLD,
            polarity: Polarity::default(),
            frames_root: PathBuf::from("frames"),
            public_prefix: "/uploads/frames".to_string(),
            jpeg_quality: DEFAULT_JPEG_QUALITY,
            deadline_ms: Some(DEFAULT_DEADLINE_MS),
            max_workers: None,
        }
    }
}

impl AnalysisConfig {
    pub fn for_quick_scan() -> Self {
        Self {
            stride: 60,
            ..Default::default()
        }
    }

    pub fn for_thorough_scan() -> Self {
        Self {
            stride: 5,
            ..Default::default()
        }
    }

    pub fn from_json5_str(text: &str) -> Result<Self, AnalysisError> {
        let config: Self = json5::from_str(text)
            .map_err(|e| AnalysisError::InvalidConfig(format!("parse failed: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, AnalysisError> {
        let path = path.as_ref();
        info!("⚙️ Loading analysis config from {}", path.display());
        let text = std::fs::read_to_string(path).map_err(|e| {
            AnalysisError::InvalidConfig(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_json5_str(&text)
    }

    /// 非法或为 0 的环境变量值直接忽略
    pub fn with_env_overrides(self) -> Self {
        self.apply_overrides(|key| env::var(key).ok())
    }

    /// `lookup` 按变量名取值，和 [`with_env_overrides`](Self::with_env_overrides) 规则相同
    pub fn apply_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(stride) = parse_var::<u64>(&lookup, "FRAME_VERDICT_STRIDE").filter(|v| *v > 0) {
            self.stride = stride;
        }
        if let Some(threshold) = parse_var::<f32>(&lookup, "FRAME_VERDICT_THRESHOLD")
            .filter(|v| (0.0..=1.0).contains(v))
        {
            self.threshold = threshold;
        }
        if let Some(root) = lookup("FRAME_VERDICT_FRAMES_ROOT") {
            if !root.trim().is_empty() {
                self.frames_root = PathBuf::from(root);
            }
        }
        if let Some(ms) = parse_var::<u64>(&lookup, "FRAME_VERDICT_DEADLINE_MS").filter(|v| *v > 0) {
            self.deadline_ms = Some(ms);
        }
        if let Some(workers) =
            parse_var::<usize>(&lookup, "FRAME_VERDICT_WORKERS").filter(|v| *v > 0)
        {
            self.max_workers = Some(workers);
        }
        self
    }

    pub fn validate(&self) -> Result<(), AnalysisError> {
        if self.stride == 0 {
            return Err(AnalysisError::InvalidConfig("stride must be >= 1".into()));
        }
        if !(0.0..=1.0).contains(&self.threshold) {
            return Err(AnalysisError::InvalidConfig(format!(
                "threshold must be in [0, 1], got {}",
                self.threshold
            )));
        }
        if self.jpeg_quality == 0 || self.jpeg_quality > 100 {
            return Err(AnalysisError::InvalidConfig(format!(
                "jpegQuality must be in 1..=100, got {}",
                self.jpeg_quality
            )));
        }
        if self.max_workers == Some(0) {
            return Err(AnalysisError::InvalidConfig("maxWorkers must be >= 1".into()));
        }
        Ok(())
    }

    pub fn deadline(&self) -> Option<Duration> {
        self.deadline_ms.map(Duration::from_millis)
    }

    pub fn worker_count(&self) -> usize {
        self.max_workers.unwrap_or_else(num_cpus::get).max(1)
    }
}

fn parse_var<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> Option<T> {
    let raw = lookup(key)?;
    match raw.trim().parse() {
        Ok(v) => Some(v),
        Err(_) => {
            warn!("⚠️ Ignoring invalid {}={}", key, raw);
            None
        }
    }
}
