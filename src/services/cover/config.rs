// 封面流水线配置
//
// 定义封面解析与缓存的可调参数。分辨率下限与缩略图最大边长
// 是经验值（常见显示尺寸乘以设备像素密度下仍然清晰），
// 作为可配置默认值而非协议常量。

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::services::cover::error::CoverError;

/// 封面流水线配置（可从 JSON 文件加载）
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CoverConfig {
    /// 同步缩略图的最大边长（像素）
    pub thumbnail_max_edge: u32,

    /// 大尺寸显示时的最大边长（像素）
    pub display_max_edge: u32,

    /// 低分辨率判定下限：最大边长低于该值视为需要刷新
    pub low_res_floor: u32,

    /// 同步缩略图的 JPEG 质量（0-100）
    pub thumbnail_quality: u8,

    /// 用户照片全尺寸存档的 JPEG 质量（0-100）
    pub photo_quality: u8,

    /// 回填任务每批处理的图书数
    pub backfill_batch_size: usize,

    /// 回填任务批次之间的延迟（毫秒）
    pub backfill_batch_delay_ms: u64,

    /// 内存缓存的字节预算
    pub memory_cache_bytes: u64,

    /// 单次下载的超时（秒）
    pub download_timeout_secs: u64,
}

impl Default for CoverConfig {
    fn default() -> Self {
        Self {
            thumbnail_max_edge: 600,
            display_max_edge: 1200,
            low_res_floor: 420,
            thumbnail_quality: 82,
            photo_quality: 95,
            backfill_batch_size: 6,
            backfill_batch_delay_ms: 120,
            memory_cache_bytes: 64 * 1024 * 1024,
            download_timeout_secs: 30,
        }
    }
}

impl CoverConfig {
    /// 从 JSON 文件加载配置
    ///
    /// 文件不存在时返回默认配置；文件存在但无法解析时返回错误
    /// （静默回落会掩盖配置书写错误）。
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, CoverError> {
        match tokio::fs::read_to_string(path.as_ref()).await {
            Ok(content) => {
                let config = serde_json::from_str(&content)?;
                Ok(config)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(CoverError::Io(e)),
        }
    }
}
