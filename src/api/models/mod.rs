pub mod report;

pub use report::{AnalysisReport, EvidenceItem, ReportSummary};
