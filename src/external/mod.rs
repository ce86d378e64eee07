pub mod open_library;

pub use open_library::fallback_cover_urls;

use async_trait::async_trait;

use crate::models::BookMetadata;

/// 元数据搜索客户端接口
///
/// 搜索与排序算法属于外部协作者；本库只依赖其返回的
/// 候选封面 URL 列表（最优在前）。
#[async_trait]
pub trait MetadataClient: Send + Sync {
    /// 按关键词搜索图书元数据
    async fn search(&self, query: &str) -> anyhow::Result<Vec<BookMetadata>>;
}
