// 缩略图编解码器 - 尺寸探测、方向校正、降采样与 JPEG 重编码
//
// 本模块提供封面图片的处理能力，包括：
// - 仅读元数据的尺寸探测（避免为尺寸检查解码整幅位图）
// - EXIF 方向校正（下游消费者无需自带方向逻辑）
// - 限定最大边长的降采样与固定质量的 JPEG 重编码
// - 低分辨率检测

use std::io::Cursor;
use std::sync::Arc;

use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::DynamicImage;
use tokio::task;

use crate::services::cover::error::ThumbnailError;

/// 缩略图编解码能力接口
///
/// 生产实现为 [`ImageCodec`]；不支持图像处理的平台可用
/// [`UnsupportedCodec`] 满足接口，保持"候选耗尽 ⇒ 占位图"契约。
pub trait ThumbnailCodec: Send + Sync {
    /// 仅读元数据探测图片尺寸（宽、高）
    ///
    /// 必须是轻量操作，不解码完整位图。
    fn probe_dimensions(&self, bytes: &[u8]) -> Result<(u32, u32), ThumbnailError>;

    /// 生成方向正确的 JPEG 编码
    ///
    /// # 参数
    /// - `bytes`: 原始图片数据
    /// - `max_edge`: 输出的最大边长；`None` 表示不降采样，
    ///   只做重编码与方向归一化（用户照片全尺寸存档）
    /// - `quality`: JPEG 质量（0-100）
    fn make_thumbnail(
        &self,
        bytes: &[u8],
        max_edge: Option<u32>,
        quality: u8,
    ) -> Result<Vec<u8>, ThumbnailError>;

    /// 判断图片是否为低分辨率
    ///
    /// 最大边长低于下限、或元数据完全不可读时返回 true
    /// （不可读视为低分辨率，走重试路径而不是默默保留垃圾数据）。
    fn is_low_resolution(&self, bytes: &[u8], floor: u32) -> bool {
        match self.probe_dimensions(bytes) {
            Ok((width, height)) => width.max(height) < floor,
            Err(_) => true,
        }
    }
}

/// 生产用编解码器（基于 image crate 与 EXIF 元数据）
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageCodec;

impl ThumbnailCodec for ImageCodec {
    fn probe_dimensions(&self, bytes: &[u8]) -> Result<(u32, u32), ThumbnailError> {
        let reader = image::io::Reader::new(Cursor::new(bytes))
            .with_guessed_format()
            .map_err(|e| ThumbnailError::UnsupportedFormat(e.to_string()))?;

        reader
            .into_dimensions()
            .map_err(|e| ThumbnailError::DecodeFailed(e.to_string()))
    }

    fn make_thumbnail(
        &self,
        bytes: &[u8],
        max_edge: Option<u32>,
        quality: u8,
    ) -> Result<Vec<u8>, ThumbnailError> {
        if bytes.is_empty() {
            return Err(ThumbnailError::CorruptedData);
        }

        let img = image::load_from_memory(bytes)
            .map_err(|e| ThumbnailError::DecodeFailed(e.to_string()))?;

        // 先校正方向，再降采样；输出不再携带方向元数据
        let orientation = read_exif_orientation(bytes);
        let img = apply_orientation(img, orientation);

        let (width, height) = (img.width(), img.height());
        let img = match max_edge {
            Some(max) if width.max(height) > max => {
                img.resize(max, max, FilterType::Lanczos3)
            }
            _ => img,
        };

        // JPEG 不支持透明通道，统一转为 RGB8 再编码
        let rgb = img.to_rgb8();
        let mut out = Cursor::new(Vec::new());
        let mut encoder = JpegEncoder::new_with_quality(&mut out, quality);
        encoder
            .encode_image(&rgb)
            .map_err(|e| ThumbnailError::EncodeFailed(e.to_string()))?;

        Ok(out.into_inner())
    }
}

/// 无图像处理支持平台的占位实现：所有操作均失败
#[derive(Debug, Clone, Copy, Default)]
pub struct UnsupportedCodec;

impl ThumbnailCodec for UnsupportedCodec {
    fn probe_dimensions(&self, _bytes: &[u8]) -> Result<(u32, u32), ThumbnailError> {
        Err(ThumbnailError::UnsupportedFormat(
            "当前平台不支持图像处理".to_string(),
        ))
    }

    fn make_thumbnail(
        &self,
        _bytes: &[u8],
        _max_edge: Option<u32>,
        _quality: u8,
    ) -> Result<Vec<u8>, ThumbnailError> {
        Err(ThumbnailError::UnsupportedFormat(
            "当前平台不支持图像处理".to_string(),
        ))
    }
}

/// 异步生成缩略图
///
/// 编解码是 CPU 密集型操作，使用 `tokio::task::spawn_blocking`
/// 移到阻塞线程池，避免阻塞协调线程。
pub async fn make_thumbnail_async(
    codec: Arc<dyn ThumbnailCodec>,
    bytes: Vec<u8>,
    max_edge: Option<u32>,
    quality: u8,
) -> Result<Vec<u8>, ThumbnailError> {
    task::spawn_blocking(move || codec.make_thumbnail(&bytes, max_edge, quality))
        .await
        .map_err(|e| ThumbnailError::TaskFailed(e.to_string()))?
}

/// 读取 EXIF 方向标签（1-8），缺失或不可读时返回 1（正置）
fn read_exif_orientation(bytes: &[u8]) -> u32 {
    let mut cursor = Cursor::new(bytes);
    match exif::Reader::new().read_from_container(&mut cursor) {
        Ok(meta) => meta
            .get_field(exif::Tag::Orientation, exif::In::PRIMARY)
            .and_then(|field| field.value.get_uint(0))
            .unwrap_or(1),
        Err(_) => 1,
    }
}

/// 按 EXIF 方向值旋转/翻转图像，使输出视觉正置
fn apply_orientation(img: DynamicImage, orientation: u32) -> DynamicImage {
    match orientation {
        2 => img.fliph(),
        3 => img.rotate180(),
        4 => img.flipv(),
        5 => img.rotate90().fliph(),
        6 => img.rotate90(),
        7 => img.rotate270().fliph(),
        8 => img.rotate270(),
        _ => img,
    }
}
