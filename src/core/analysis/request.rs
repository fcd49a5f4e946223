use crate::core::video::VideoSource;
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;
use std::path::Path;
use uuid::Uuid;

static UNSAFE_CHARS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^A-Za-z0-9_.-]+").expect("valid regex"));

/// 请求级唯一 ID，同时决定帧目录名 `frames_{stem}_{uuid}`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequestId {
    stem: String,
    uuid: Uuid,
}

impl RequestId {
    pub fn for_video(name: &str) -> Self {
        Self::with_uuid(name, Uuid::now_v7())
    }

    pub fn with_uuid(name: &str, uuid: Uuid) -> Self {
        let file_name = Path::new(name)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let stem = match file_name.rsplit_once('.') {
            Some((stem, _ext)) if !stem.is_empty() => stem.to_string(),
            _ => file_name,
        };
        Self {
            stem: sanitize_stem(&stem),
            uuid,
        }
    }

    pub fn stem(&self) -> &str {
        &self.stem
    }

    pub fn frames_dir_name(&self) -> String {
        format!("frames_{}_{}", self.stem, self.uuid.simple())
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.stem, self.uuid.simple())
    }
}

/// 类似 secure_filename：只留 ASCII 单词字符、`.`、`-`，去掉开头的点和下划线
fn sanitize_stem(name: &str) -> String {
    let cleaned = UNSAFE_CHARS.replace_all(name.trim(), "_");
    let cleaned = cleaned
        .trim_start_matches(['.', '_'])
        .trim_end_matches('_');
    if cleaned.is_empty() {
        "video".to_string()
    } else {
        cleaned.to_string()
    }
}

/// 一个待分析的视频
pub struct AnalysisRequest {
    pub id: RequestId,
    pub source: Box<dyn VideoSource>,
}

impl AnalysisRequest {
    pub fn new(source: Box<dyn VideoSource>) -> Self {
        let id = RequestId::for_video(&source.describe());
        Self { id, source }
    }

    pub fn with_id(id: RequestId, source: Box<dyn VideoSource>) -> Self {
        Self { id, source }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::video::InMemorySource;

    #[test]
    fn test_frames_dir_name() {
        let uuid = Uuid::nil();
        let id = RequestId::with_uuid("/uploads/My Clip (1).mp4", uuid);
        assert_eq!(id.stem(), "My_Clip_1");
        assert_eq!(
            id.frames_dir_name(),
            "frames_My_Clip_1_00000000000000000000000000000000"
        );
    }

    #[test]
    fn test_sanitize_edge_cases() {
        assert_eq!(sanitize_stem("../../etc/passwd"), "etc_passwd");
        assert_eq!(sanitize_stem(".hidden"), "hidden");
        assert_eq!(sanitize_stem("视频"), "video");
        assert_eq!(sanitize_stem(""), "video");
        assert_eq!(sanitize_stem("clip-v2.final"), "clip-v2.final");
    }

    #[test]
    fn test_dotfile_and_extensionless_names() {
        let uuid = Uuid::nil();
        assert_eq!(RequestId::with_uuid(".mp4", uuid).stem(), "mp4");
        assert_eq!(RequestId::with_uuid("clip", uuid).stem(), "clip");
        assert_eq!(RequestId::with_uuid("", uuid).stem(), "video");
    }

    #[test]
    fn test_request_ids_are_unique() {
        let a = RequestId::for_video("clip.mp4");
        let b = RequestId::for_video("clip.mp4");
        assert_eq!(a.stem(), b.stem());
        assert_ne!(a.frames_dir_name(), b.frames_dir_name());
    }

    #[test]
    fn test_request_from_source_name() {
        let request = AnalysisRequest::new(Box::new(InMemorySource::solid("interview.mov", 1)));
        assert_eq!(request.id.stem(), "interview");
    }
}
