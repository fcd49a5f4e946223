//! 视频源：按显示顺序逐帧吐出解码后的图像

use super::frame::DecodedFrame;
use crate::core::error::{AnalysisError, DecodeError};
use log::{debug, info, warn};
use serde::Deserialize;
use std::io::{ErrorKind, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdout, Command, Stdio};

pub trait VideoSource: Send {
    /// 用于日志和错误信息
    fn describe(&self) -> String;

    /// 打不开就是致命错误
    fn open(&mut self) -> Result<(), AnalysisError>;

    /// `Ok(None)` 表示流结束
    fn next_frame(&mut self) -> Result<Option<DecodedFrame>, DecodeError>;
}

/// 调用 ffmpeg 解码，rgb24 rawvideo 走管道
pub struct FfmpegSource {
    path: PathBuf,
    ffmpeg_bin: String,
    ffprobe_bin: String,
    dimensions: Option<(u32, u32)>,
    child: Option<Child>,
    stdout: Option<ChildStdout>,
}

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    width: Option<u32>,
    height: Option<u32>,
}

impl FfmpegSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            ffmpeg_bin: "ffmpeg".to_string(),
            ffprobe_bin: "ffprobe".to_string(),
            dimensions: None,
            child: None,
            stdout: None,
        }
    }

    pub fn with_binaries(mut self, ffmpeg: impl Into<String>, ffprobe: impl Into<String>) -> Self {
        self.ffmpeg_bin = ffmpeg.into();
        self.ffprobe_bin = ffprobe.into();
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn dimensions(&self) -> Option<(u32, u32)> {
        self.dimensions
    }

    /// ffmpeg 子进程是否还在（流结束或截断后会被回收）
    pub fn is_decoding(&self) -> bool {
        self.child.is_some()
    }

    fn probe_dimensions(&self) -> Result<(u32, u32), AnalysisError> {
        let output = Command::new(&self.ffprobe_bin)
            .args(["-v", "error"])
            .args(["-select_streams", "v:0"])
            .args(["-show_entries", "stream=width,height"])
            .args(["-of", "json"])
            .arg(&self.path)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .map_err(|e| self.unreadable(format!("ffprobe not available: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(self.unreadable(format!("ffprobe failed: {}", stderr.trim())));
        }

        parse_probe_output(&output.stdout).map_err(|reason| self.unreadable(reason))
    }

    fn unreadable(&self, reason: String) -> AnalysisError {
        AnalysisError::source_unreadable(self.describe(), reason)
    }

    fn shutdown(&mut self) {
        self.stdout = None;
        if let Some(mut child) = self.child.take() {
            let _ = child.kill();
            let _ = child.wait();
        }
    }
}

fn parse_probe_output(stdout: &[u8]) -> Result<(u32, u32), String> {
    let probe: ProbeOutput =
        serde_json::from_slice(stdout).map_err(|e| format!("invalid ffprobe output: {}", e))?;

    probe
        .streams
        .into_iter()
        .find_map(|s| match (s.width, s.height) {
            (Some(w), Some(h)) if w > 0 && h > 0 => Some((w, h)),
            _ => None,
        })
        .ok_or_else(|| "no video stream".to_string())
}

impl VideoSource for FfmpegSource {
    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    fn open(&mut self) -> Result<(), AnalysisError> {
        if !self.path.is_file() {
            return Err(self.unreadable("file not found".to_string()));
        }

        let (width, height) = self.probe_dimensions()?;
        info!("🎬 Opening {} ({}x{})", self.describe(), width, height);

        let mut child = Command::new(&self.ffmpeg_bin)
            .args(["-hide_banner", "-loglevel", "error", "-nostdin"])
            .arg("-noautorotate")
            .arg("-i")
            .arg(&self.path)
            .args(["-an", "-sn"])
            .args(["-fps_mode", "passthrough"])
            .args(["-f", "rawvideo", "-pix_fmt", "rgb24", "-"])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| self.unreadable(format!("ffmpeg not available: {}", e)))?;

        self.stdout = child.stdout.take();
        self.child = Some(child);
        self.dimensions = Some((width, height));
        Ok(())
    }

    fn next_frame(&mut self) -> Result<Option<DecodedFrame>, DecodeError> {
        let (width, height) = match self.dimensions {
            Some(d) => d,
            None => return Ok(None),
        };
        let stdout = match self.stdout.as_mut() {
            Some(s) => s,
            None => return Ok(None),
        };

        let expected = DecodedFrame::byte_len(width, height);
        let mut buf = vec![0u8; expected];
        let mut filled = 0;

        while filled < expected {
            match stdout.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(DecodeError::Io(e)),
            }
        }

        if filled == 0 {
            debug!("ffmpeg stream ended for {}", self.describe());
            self.shutdown();
            return Ok(None);
        }
        if filled < expected {
            warn!(
                "⚠️ Truncated frame from {}: {} of {} bytes",
                self.describe(),
                filled,
                expected
            );
            self.shutdown();
            return Err(DecodeError::Truncated {
                expected,
                got: filled,
            });
        }

        Ok(Some(DecodedFrame::new(width, height, buf)))
    }
}

impl Drop for FfmpegSource {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// 已经在内存里的帧序列（宿主自己解码，或测试）
pub struct InMemorySource {
    name: String,
    frames: std::vec::IntoIter<DecodedFrame>,
    position: usize,
    fail_at: Option<usize>,
    open_error: Option<String>,
}

impl InMemorySource {
    pub fn new(name: impl Into<String>, frames: Vec<DecodedFrame>) -> Self {
        Self {
            name: name.into(),
            frames: frames.into_iter(),
            position: 0,
            fail_at: None,
            open_error: None,
        }
    }

    /// `count` 帧纯色小图
    pub fn solid(name: impl Into<String>, count: usize) -> Self {
        let frames = (0..count)
            .map(|i| DecodedFrame::filled(16, 16, [(i % 256) as u8, 64, 128]))
            .collect();
        Self::new(name, frames)
    }

    /// 第 `position` 帧（0 起）解码失败
    pub fn with_decode_failure_at(mut self, position: usize) -> Self {
        self.fail_at = Some(position);
        self
    }

    pub fn unreadable(name: impl Into<String>, reason: impl Into<String>) -> Self {
        let mut source = Self::new(name, Vec::new());
        source.open_error = Some(reason.into());
        source
    }
}

impl VideoSource for InMemorySource {
    fn describe(&self) -> String {
        self.name.clone()
    }

    fn open(&mut self) -> Result<(), AnalysisError> {
        match &self.open_error {
            Some(reason) => Err(AnalysisError::source_unreadable(&self.name, reason.clone())),
            None => Ok(()),
        }
    }

    fn next_frame(&mut self) -> Result<Option<DecodedFrame>, DecodeError> {
        if self.fail_at == Some(self.position) {
            return Err(DecodeError::Corrupt(format!(
                "frame {} of {}",
                self.position, self.name
            )));
        }
        self.position += 1;
        Ok(self.frames.next())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn test_parse_probe_output() {
        let json = br#"{"programs":[],"streams":[{"width":1280,"height":720}]}"#;
        assert_eq!(parse_probe_output(json).unwrap(), (1280, 720));
    }

    #[test]
    fn test_parse_probe_output_without_stream() {
        assert_eq!(
            parse_probe_output(br#"{"streams":[]}"#).unwrap_err(),
            "no video stream"
        );
        assert_eq!(parse_probe_output(b"{}").unwrap_err(), "no video stream");
        assert!(parse_probe_output(b"not json").is_err());
    }

    #[test]
    fn test_missing_file_is_unreadable() {
        let mut source = FfmpegSource::new("/nonexistent/clip.mp4");
        assert_matches!(
            source.open(),
            Err(AnalysisError::SourceUnreadable { .. })
        );
        assert!(source.next_frame().unwrap().is_none());
    }

    #[cfg(unix)]
    fn fake_tool(dir: &Path, name: &str, body: &str) -> String {
        use std::os::unix::fs::PermissionsExt;

        let path = dir.join(name);
        std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path.to_string_lossy().into_owned()
    }

    /// 2x2 的假视频，ffmpeg 一共吐出 `bytes` 字节（每帧 12 字节）
    #[cfg(unix)]
    fn scripted_ffmpeg(dir: &Path, bytes: usize) -> FfmpegSource {
        let video = dir.join("clip.mp4");
        std::fs::write(&video, b"placeholder").unwrap();
        let ffprobe = fake_tool(
            dir,
            "ffprobe",
            r#"echo '{"streams":[{"width":2,"height":2}]}'"#,
        );
        let ffmpeg = fake_tool(dir, "ffmpeg", &format!("printf '%0{}d' 0", bytes));
        FfmpegSource::new(video).with_binaries(ffmpeg, ffprobe)
    }

    #[cfg(unix)]
    #[test]
    fn test_ffmpeg_short_read_is_truncated() {
        let dir = tempfile::tempdir().unwrap();
        let mut source = scripted_ffmpeg(dir.path(), 29);

        source.open().unwrap();
        assert_eq!(source.dimensions(), Some((2, 2)));
        assert!(source.is_decoding());

        let frame = source.next_frame().unwrap().unwrap();
        assert_eq!(frame.data.len(), 12);
        assert_eq!(frame.data[0], b'0');
        assert!(source.next_frame().unwrap().is_some());
        assert_matches!(
            source.next_frame(),
            Err(DecodeError::Truncated {
                expected: 12,
                got: 5
            })
        );
        assert!(!source.is_decoding());
        assert!(source.next_frame().unwrap().is_none());
    }

    #[cfg(unix)]
    #[test]
    fn test_ffmpeg_clean_end_of_stream() {
        let dir = tempfile::tempdir().unwrap();
        let mut source = scripted_ffmpeg(dir.path(), 24);

        source.open().unwrap();
        assert!(source.next_frame().unwrap().is_some());
        assert!(source.next_frame().unwrap().is_some());
        assert!(source.next_frame().unwrap().is_none());
        assert!(!source.is_decoding());
    }

    #[cfg(unix)]
    #[test]
    fn test_sampler_keeps_frames_before_truncation() {
        use crate::core::video::{DiskFrameStore, FrameSampler};

        let dir = tempfile::tempdir().unwrap();
        let mut source = scripted_ffmpeg(dir.path(), 29);
        let mut store = DiskFrameStore::create(dir.path(), "frames_clip", 90).unwrap();

        let records = FrameSampler::with_stride(1)
            .sample(&mut source, &mut store)
            .unwrap();
        let indices: Vec<u64> = records.iter().map(|r| r.index).collect();
        assert_eq!(indices, vec![0, 1]);
    }

    #[cfg(unix)]
    #[test]
    fn test_ffprobe_failure_is_unreadable() {
        let dir = tempfile::tempdir().unwrap();
        let video = dir.path().join("clip.mp4");
        std::fs::write(&video, b"placeholder").unwrap();
        let ffprobe = fake_tool(dir.path(), "ffprobe", "echo 'moov atom not found' >&2; exit 1");

        let mut source = FfmpegSource::new(video).with_binaries("ffmpeg", ffprobe);
        assert_matches!(
            source.open(),
            Err(AnalysisError::SourceUnreadable { reason, .. }) if reason.contains("moov atom")
        );
    }

    #[test]
    fn test_in_memory_source_decode_failure() {
        let mut source = InMemorySource::solid("clip", 5).with_decode_failure_at(2);
        source.open().unwrap();
        assert!(source.next_frame().unwrap().is_some());
        assert!(source.next_frame().unwrap().is_some());
        assert_matches!(source.next_frame(), Err(DecodeError::Corrupt(_)));
    }

    #[test]
    fn test_in_memory_source_unreadable() {
        let mut source = InMemorySource::unreadable("broken.mp4", "moov atom not found");
        assert_matches!(
            source.open(),
            Err(AnalysisError::SourceUnreadable { source_name, .. }) if source_name == "broken.mp4"
        );
    }
}
