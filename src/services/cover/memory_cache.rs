// 内存图片缓存 - 最快的缓存层级，进程生命周期内有效
//
// 以 URL 为键缓存原始图片字节。采用按字节计权的 LRU 上限，
// 避免在内存受限设备上无界增长（来源实现未约定淘汰策略，
// 此处选择有界 LRU）。

use std::sync::Arc;

use moka::future::Cache;

/// 内存图片缓存
///
/// 写入为整条替换（last-write-wins），同一键的并发写入是安全的；
/// 读取永远不会观察到部分写入的条目。
#[derive(Clone)]
pub struct MemoryImageCache {
    inner: Cache<String, Arc<Vec<u8>>>,
}

impl MemoryImageCache {
    /// 创建内存缓存
    ///
    /// # 参数
    /// - `max_bytes`: 缓存的字节预算（键与值的长度之和计权）
    pub fn new(max_bytes: u64) -> Self {
        let inner = Cache::builder()
            .weigher(|key: &String, value: &Arc<Vec<u8>>| {
                (key.len() + value.len()).try_into().unwrap_or(u32::MAX)
            })
            .max_capacity(max_bytes)
            .build();

        Self { inner }
    }

    /// 按 URL 读取缓存条目
    pub async fn get(&self, url: &str) -> Option<Arc<Vec<u8>>> {
        self.inner.get(url).await
    }

    /// 写入缓存条目
    pub async fn insert(&self, url: String, bytes: Vec<u8>) {
        self.inner.insert(url, Arc::new(bytes)).await;
    }

    /// 移除缓存条目
    pub async fn remove(&self, url: &str) {
        self.inner.invalidate(url).await;
    }

    /// 清空缓存
    pub fn clear(&self) {
        self.inner.invalidate_all();
    }

    /// 当前条目数（测试用）
    pub fn entry_count(&self) -> u64 {
        self.inner.entry_count()
    }
}
