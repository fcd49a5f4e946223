//! 抽样帧落盘
//!
//! 目录布局：`{frames_root}/{request_dir}/frame{index}.jpg`，
//! request_dir 每个请求唯一，locator 只凭 index 即可重新推导。

use super::frame::{DecodedFrame, FrameRecord};
use crate::core::error::StorageError;
use image::ImageOutputFormat;
use log::debug;
use std::fs::{self, File};
use std::io::{Cursor, Write};
use std::path::{Component, Path, PathBuf};

pub trait FrameStore: Send {
    /// 返回前图片必须已经写盘
    fn persist(&mut self, index: u64, frame: &DecodedFrame) -> Result<FrameRecord, StorageError>;

    fn locator_for(&self, index: u64) -> String;
}

pub struct DiskFrameStore {
    request_dir: String,
    dir: PathBuf,
    jpeg_quality: u8,
}

impl DiskFrameStore {
    pub fn create(
        root: impl AsRef<Path>,
        request_dir: impl Into<String>,
        jpeg_quality: u8,
    ) -> Result<Self, StorageError> {
        let request_dir = request_dir.into();
        if !is_plain_segment(&request_dir) {
            return Err(StorageError::InvalidLocator(request_dir));
        }

        let dir = root.as_ref().join(&request_dir);
        fs::create_dir_all(&dir)?;
        debug!("📁 Frames directory ready: {}", dir.display());

        Ok(Self {
            request_dir,
            dir,
            jpeg_quality: jpeg_quality.clamp(1, 100),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn request_dir(&self) -> &str {
        &self.request_dir
    }

    pub fn file_name(index: u64) -> String {
        format!("{}.jpg", FrameRecord::identifier_for(index))
    }

    /// 给静态文件服务用的 URL，例如 `/uploads/frames/frames_clip_x/frame20.jpg`
    pub fn public_url(prefix: &str, request_dir: &str, identifier: &str) -> String {
        format!(
            "{}/{}/{}.jpg",
            prefix.trim_end_matches('/'),
            request_dir,
            identifier
        )
    }

    /// 把 public URL 映射回磁盘路径；拒绝 `..`、绝对路径和别的前缀
    pub fn resolve_public_path(
        root: impl AsRef<Path>,
        prefix: &str,
        url: &str,
    ) -> Result<PathBuf, StorageError> {
        let invalid = || StorageError::InvalidLocator(url.to_string());

        let prefix = prefix.trim_end_matches('/');
        let rest = url
            .strip_prefix(prefix)
            .and_then(|r| r.strip_prefix('/'))
            .ok_or_else(invalid)?;

        let parts: Vec<&str> = rest.split('/').collect();
        match parts.as_slice() {
            [dir, file] if is_plain_segment(dir) && is_plain_segment(file) => {
                Ok(root.as_ref().join(dir).join(file))
            }
            _ => Err(invalid()),
        }
    }

    fn encode_jpeg(&self, frame: &DecodedFrame) -> Result<Vec<u8>, StorageError> {
        let img = frame.to_image().ok_or_else(|| {
            StorageError::InvalidFrame(format!(
                "{} bytes for {}x{}",
                frame.data.len(),
                frame.width,
                frame.height
            ))
        })?;

        let mut buffer = Cursor::new(Vec::new());
        img.write_to(&mut buffer, ImageOutputFormat::Jpeg(self.jpeg_quality))?;
        Ok(buffer.into_inner())
    }
}

impl FrameStore for DiskFrameStore {
    fn persist(&mut self, index: u64, frame: &DecodedFrame) -> Result<FrameRecord, StorageError> {
        let jpeg = self.encode_jpeg(frame)?;

        let path = self.dir.join(Self::file_name(index));
        let tmp_path = self.dir.join(format!("{}.tmp", Self::file_name(index)));
        if let Err(e) = write_synced(&tmp_path, &jpeg).and_then(|_| fs::rename(&tmp_path, &path)) {
            let _ = fs::remove_file(&tmp_path);
            return Err(e.into());
        }
        sync_dir(&self.dir)?;

        Ok(FrameRecord::new(index, path.to_string_lossy()))
    }

    fn locator_for(&self, index: u64) -> String {
        self.dir.join(Self::file_name(index)).to_string_lossy().into_owned()
    }
}

fn write_synced(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut file = File::create(path)?;
    file.write_all(bytes)?;
    file.sync_all()
}

/// rename 之后目录项也要落盘
#[cfg(unix)]
fn sync_dir(dir: &Path) -> std::io::Result<()> {
    File::open(dir)?.sync_all()
}

#[cfg(not(unix))]
fn sync_dir(_dir: &Path) -> std::io::Result<()> {
    Ok(())
}

/// locator 里的帧号：文件名 `frame{index}[.ext]`
pub fn parse_frame_index(locator: &str) -> Option<u64> {
    let name = locator.rsplit(['/', '\\']).next()?;
    let stem = name.split('.').next()?;
    stem.strip_prefix("frame")?.parse().ok()
}

fn is_plain_segment(segment: &str) -> bool {
    if segment.is_empty() || segment.contains('\\') {
        return false;
    }
    let mut components = Path::new(segment).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}
