//! 单个视频分析请求的编排：Sampling → Scoring → 终态

pub mod analyzer;
pub mod request;
pub mod state;

pub use analyzer::{VideoAnalysis, VideoAnalyzer};
pub use request::{AnalysisRequest, RequestId};
pub use state::{AnalysisEvent, AnalysisState};
