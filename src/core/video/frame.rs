use image::RgbImage;

/// 解码出来的一帧（RGB24，按显示顺序）
#[derive(Debug, Clone)]
pub struct DecodedFrame {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>, // RGB 格式
}

impl DecodedFrame {
    pub fn new(width: u32, height: u32, data: Vec<u8>) -> Self {
        Self {
            width,
            height,
            data,
        }
    }

    /// 纯色帧，测试和占位用
    pub fn filled(width: u32, height: u32, rgb: [u8; 3]) -> Self {
        let data = rgb
            .iter()
            .copied()
            .cycle()
            .take((width * height * 3) as usize)
            .collect();
        Self::new(width, height, data)
    }

    pub fn pixel_count(&self) -> usize {
        (self.width * self.height) as usize
    }

    pub fn byte_len(width: u32, height: u32) -> usize {
        width as usize * height as usize * 3
    }

    /// 数据长度和尺寸对不上时返回 None
    pub fn to_image(&self) -> Option<RgbImage> {
        RgbImage::from_raw(self.width, self.height, self.data.clone())
    }
}

impl From<RgbImage> for DecodedFrame {
    fn from(img: RgbImage) -> Self {
        let (width, height) = img.dimensions();
        Self::new(width, height, img.into_raw())
    }
}

/// 一帧被保留的抽样帧，落盘后创建，之后不再修改
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameRecord {
    /// 在完整解码序列中的位置（不是抽样序号）
    pub index: u64,
    pub identifier: String,
    /// 落盘位置，由 FrameStore 决定
    pub locator: String,
}

impl FrameRecord {
    pub fn new(index: u64, locator: impl Into<String>) -> Self {
        Self {
            index,
            identifier: Self::identifier_for(index),
            locator: locator.into(),
        }
    }

    pub fn identifier_for(index: u64) -> String {
        format!("frame{}", index)
    }
}
