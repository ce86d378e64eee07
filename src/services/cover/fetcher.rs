// 图片字节获取器 - 内存 → 磁盘 → 网络的分层获取
//
// 获取某个 URL 的原始图片字节，发起网络请求前依次查询两级缓存。
// 本地文件引用不经过缓存层，直接读盘（本地读取本身足够快，
// 且必须反映磁盘上的当前内容）。

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tokio::fs;
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::services::cover::disk_cache::DiskImageCache;
use crate::services::cover::error::{CoverError, DownloadError};
use crate::services::cover::memory_cache::MemoryImageCache;
use crate::services::cover::url_upgrader::is_local_url;

/// 字节获取接口
///
/// 解析引擎通过该接口取字节，测试可注入无网络的假实现。
#[async_trait]
pub trait ByteFetcher: Send + Sync {
    /// 获取 URL 对应的原始字节
    ///
    /// 任何失败（网络错误、非 2xx 状态、本地文件缺失）都表示
    /// "该候选不可用"，由调用方尝试下一个候选。
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, CoverError>;
}

/// 分层图片字节获取器
pub struct ImageByteFetcher {
    /// HTTP 客户端（连接池复用）
    client: Client,

    /// 内存缓存（第一层）
    memory: Arc<MemoryImageCache>,

    /// 磁盘缓存（第二层）
    disk: Arc<DiskImageCache>,

    /// 单次下载超时
    download_timeout: Duration,
}

impl ImageByteFetcher {
    /// 创建获取器
    ///
    /// # 参数
    /// - `memory`: 内存缓存实例
    /// - `disk`: 磁盘缓存实例
    /// - `download_timeout`: 单次网络下载的超时
    pub fn new(
        memory: Arc<MemoryImageCache>,
        disk: Arc<DiskImageCache>,
        download_timeout: Duration,
    ) -> Result<Self, CoverError> {
        let client = Client::builder()
            .pool_max_idle_per_host(10)
            .pool_idle_timeout(Duration::from_secs(90))
            .build()
            .map_err(|e| CoverError::Config(format!("创建 HTTP 客户端失败: {}", e)))?;

        Ok(Self {
            client,
            memory,
            disk,
            download_timeout,
        })
    }

    /// 发起网络 GET 并读取响应体
    async fn download(&self, url: &str) -> Result<Vec<u8>, CoverError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| CoverError::Download(DownloadError::from(e)))?;

        let status = response.status();
        if !status.is_success() {
            // 非 2xx 是候选级失败，不是解码路径上的异常
            return Err(CoverError::Download(DownloadError::HttpStatus(
                status.as_u16(),
            )));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| CoverError::Download(DownloadError::from(e)))?;

        Ok(bytes.to_vec())
    }

    /// 网络下载（带超时控制）
    async fn download_with_timeout(&self, url: &str) -> Result<Vec<u8>, CoverError> {
        match timeout(self.download_timeout, self.download(url)).await {
            Ok(result) => result,
            Err(_) => Err(CoverError::Download(DownloadError::Timeout)),
        }
    }
}

#[async_trait]
impl ByteFetcher for ImageByteFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, CoverError> {
        // 1. 本地文件引用：直接读盘，不经过缓存层
        if is_local_url(url) {
            let path = url.strip_prefix("file://").unwrap_or(url);
            return fs::read(path).await.map_err(CoverError::Io);
        }

        // 2. 内存缓存
        if let Some(bytes) = self.memory.get(url).await {
            debug!("内存缓存命中: {}", url);
            return Ok(bytes.as_ref().clone());
        }

        // 3. 磁盘缓存（命中时回填内存缓存）
        if let Some(bytes) = self.disk.get(url).await {
            self.memory.insert(url.to_string(), bytes.clone()).await;
            return Ok(bytes);
        }

        // 4. 网络下载；成功后以实际请求的 URL 为键写入两级缓存
        let bytes = self.download_with_timeout(url).await?;
        debug!("网络下载成功: {} ({} 字节)", url, bytes.len());

        if let Err(e) = self.disk.insert(url, &bytes).await {
            // 磁盘写入失败只降级为纯内存缓存，不影响本次结果
            warn!("磁盘缓存写入失败: {} - {:?}", url, e);
        }
        self.memory.insert(url.to_string(), bytes.clone()).await;

        Ok(bytes)
    }
}
