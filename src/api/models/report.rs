use crate::core::analysis::VideoAnalysis;
use crate::core::verdict::{Evidence, Label};
use crate::core::video::DiskFrameStore;
use serde::{Deserialize, Serialize};

/// 对外的分析结果，证据列表保持抽帧顺序
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisReport {
    pub request_id: String,
    pub total_frames_sampled: usize,
    pub total_frames_scored: usize,
    pub scoring_errors: usize,
    pub fake_frame_count: usize,
    pub authentic_frame_count: usize,
    pub average_confidence: f64,
    pub overall_label: Label,
    pub summary: ReportSummary,
    pub evidence: Vec<EvidenceItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvidenceItem {
    pub identifier: String,
    pub locator: String,
    /// 给前端展示帧图片的 URL
    pub url: String,
    pub confidence: Option<f32>,
    pub label: Option<Label>,
    pub failed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// 概要，前端直接展示
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportSummary {
    pub status: String,
    /// 平均 confidence × 100，保留两位小数
    pub confidence_percentage: f64,
    pub total_frames: usize,
    pub real_frames: usize,
    pub fake_frames: usize,
}

impl AnalysisReport {
    pub fn from_analysis(analysis: &VideoAnalysis, public_prefix: &str) -> Self {
        let verdict = &analysis.verdict;

        let evidence = verdict
            .evidence
            .iter()
            .map(|e| EvidenceItem::from_evidence(e, public_prefix, &analysis.frames_dir))
            .collect();

        Self {
            request_id: analysis.id.to_string(),
            total_frames_sampled: verdict.total_frames_sampled,
            total_frames_scored: verdict.total_frames_scored,
            scoring_errors: verdict.scoring_errors,
            fake_frame_count: verdict.fake_frame_count,
            authentic_frame_count: verdict.authentic_frame_count,
            average_confidence: verdict.average_confidence,
            overall_label: verdict.overall_label,
            summary: ReportSummary {
                status: verdict.overall_label.as_str().to_string(),
                confidence_percentage: (verdict.average_confidence * 10_000.0).round() / 100.0,
                total_frames: verdict.total_frames_scored,
                real_frames: verdict.authentic_frame_count,
                fake_frames: verdict.fake_frame_count,
            },
            evidence,
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

impl EvidenceItem {
    fn from_evidence(evidence: &Evidence, public_prefix: &str, frames_dir: &str) -> Self {
        let frame = &evidence.frame;
        Self {
            identifier: frame.identifier.clone(),
            locator: frame.locator.clone(),
            url: DiskFrameStore::public_url(public_prefix, frames_dir, &frame.identifier),
            confidence: evidence.outcome.confidence(),
            label: evidence.outcome.label(),
            failed: evidence.outcome.is_failed(),
            error: evidence.outcome.failure_reason(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::analysis::RequestId;
    use crate::core::error::{FrameError, ScoreError};
    use crate::core::verdict::{ScoreOutcome, VerdictAccumulator};
    use crate::core::video::FrameRecord;
    use std::time::Duration;
    use uuid::Uuid;

    fn sample_analysis() -> VideoAnalysis {
        let mut acc = VerdictAccumulator::new();
        acc.record(
            FrameRecord::new(0, "/data/frames/req/frame0.jpg"),
            ScoreOutcome::failed(FrameError::Scorer(ScoreError::Unavailable("oom".into()))),
        );
        acc.record(
            FrameRecord::new(20, "/data/frames/req/frame20.jpg"),
            ScoreOutcome::scored(0.6, Label::Authentic),
        );

        VideoAnalysis {
            id: RequestId::with_uuid("clip.mp4", Uuid::nil()),
            frames_dir: "req".to_string(),
            verdict: acc.finalize().unwrap(),
            elapsed: Duration::from_millis(12),
        }
    }

    #[test]
    fn test_report_fields() {
        let report = AnalysisReport::from_analysis(&sample_analysis(), "/uploads/frames");

        assert_eq!(report.total_frames_sampled, 2);
        assert_eq!(report.scoring_errors, 1);
        assert_eq!(report.overall_label, Label::Authentic);
        assert_eq!(report.summary.status, "authentic");
        assert_eq!(report.summary.confidence_percentage, 60.0);

        let failed = &report.evidence[0];
        assert!(failed.failed);
        assert_eq!(failed.confidence, None);
        assert_eq!(failed.label, None);
        assert_eq!(
            failed.error.as_deref(),
            Some("Scorer failed: Classifier unavailable: oom")
        );

        let scored = &report.evidence[1];
        assert_eq!(scored.identifier, "frame20");
        assert_eq!(scored.url, "/uploads/frames/req/frame20.jpg");
        assert_eq!(scored.confidence, Some(0.6));
    }

    #[test]
    fn test_report_json_shape() {
        let report = AnalysisReport::from_analysis(&sample_analysis(), "/uploads/frames");
        let value: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();

        assert_eq!(value["totalFramesSampled"], 2);
        assert_eq!(value["overallLabel"], "authentic");
        assert_eq!(value["summary"]["realFrames"], 1);
        assert_eq!(value["evidence"][0]["failed"], true);
        assert!(value["evidence"][0]["confidence"].is_null());
        assert!(value["evidence"][1].get("error").is_none());
        assert_eq!(value["evidence"][1]["label"], "authentic");
    }
}
