// 封面模块 - 图书封面的解析、缓存与缩略图流水线
//
// 本模块提供图书封面的完整生命周期管理，包括：
// - 提供商 URL 的尺寸升级改写
// - 内存 → 磁盘 → 网络的分层字节获取
// - 方向校正与缩略图生成
// - 按序候选解析与请求合并
// - 库级回填任务与封面服务编排

pub mod backfill;
pub mod config;
pub mod disk_cache;
pub mod error;
pub mod fetcher;
pub mod memory_cache;
pub mod resolver;
pub mod service;
pub mod thumbnail;
pub mod url_upgrader;

pub use backfill::{BackfillStats, LibraryBackfillJob};
pub use config::CoverConfig;
pub use disk_cache::DiskImageCache;
pub use error::{CoverError, DownloadError, ThumbnailError};
pub use fetcher::{ByteFetcher, ImageByteFetcher};
pub use memory_cache::MemoryImageCache;
pub use resolver::{CoverResolutionEngine, ResolvedCover};
pub use service::{CoverImage, CoverService};
pub use thumbnail::{make_thumbnail_async, ImageCodec, ThumbnailCodec, UnsupportedCodec};
pub use url_upgrader::{is_local_url, upgrade, upgraded_if_different, CoverTarget};
