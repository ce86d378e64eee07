// 磁盘图片缓存 - 跨进程重启的持久缓存层级
//
// 以 URL 的 SHA-256 摘要为文件名，将原始图片字节保存在本地
// 缓存目录下。内存未命中后、发起网络请求前查询本层。

use std::path::PathBuf;

use sha2::{Digest, Sha256};
use tokio::fs;
use tracing::{debug, warn};

use crate::services::cover::error::CoverError;

/// 磁盘图片缓存
pub struct DiskImageCache {
    /// 缓存根目录
    root: PathBuf,
}

impl DiskImageCache {
    /// 创建磁盘缓存
    ///
    /// # 参数
    /// - `root`: 缓存根目录（不存在时自动创建）
    pub async fn new(root: PathBuf) -> Result<Self, CoverError> {
        fs::create_dir_all(&root).await?;
        Ok(Self { root })
    }

    /// URL 对应的缓存文件路径
    fn entry_path(&self, url: &str) -> PathBuf {
        let digest = Sha256::digest(url.as_bytes());
        let name: String = digest.iter().map(|b| format!("{:02x}", b)).collect();
        self.root.join(format!("{}.img", name))
    }

    /// 按 URL 读取缓存字节
    ///
    /// 读取失败（条目缺失或文件损坏到无法读出）一律视为未命中。
    pub async fn get(&self, url: &str) -> Option<Vec<u8>> {
        let path = self.entry_path(url);
        match fs::read(&path).await {
            Ok(bytes) => {
                debug!("磁盘缓存命中: {}", url);
                Some(bytes)
            }
            Err(_) => None,
        }
    }

    /// 写入缓存条目（整条替换）
    pub async fn insert(&self, url: &str, bytes: &[u8]) -> Result<(), CoverError> {
        let path = self.entry_path(url);
        fs::write(&path, bytes).await?;
        debug!("磁盘缓存写入: {} ({} 字节)", url, bytes.len());
        Ok(())
    }

    /// 移除缓存条目（条目不存在时视为成功）
    pub async fn remove(&self, url: &str) -> Result<(), CoverError> {
        let path = self.entry_path(url);
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(CoverError::Io(e)),
        }
    }

    /// 清空整个缓存目录，返回删除的条目数
    pub async fn clear(&self) -> Result<usize, CoverError> {
        let mut removed = 0;
        let mut entries = fs::read_dir(&self.root).await?;

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().map(|ext| ext == "img").unwrap_or(false) {
                if let Err(e) = fs::remove_file(&path).await {
                    warn!("缓存条目删除失败: {:?} - {}", path, e);
                } else {
                    removed += 1;
                }
            }
        }

        Ok(removed)
    }
}
