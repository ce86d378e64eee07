// 本地记录存储
//
// 图书记录的键值实体存储接口与用户照片文件存储，包括：
// - BookStore：按 ID 存取与全量查询（持久层为外部协作者，
//   测试与运行器使用内存实现）
// - PhotoStore：用户上传照片的应用私有文件存储

use std::path::PathBuf;

use async_trait::async_trait;
use thiserror::Error;
use tokio::fs;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use crate::models::Book;

/// 存储操作错误
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO 错误: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON 序列化错误: {0}")]
    Json(#[from] serde_json::Error),

    #[error("记录不存在: {0}")]
    NotFound(String),
}

/// 图书记录存储接口
///
/// 键值实体存储：支持全量读取、按 ID 读取和整条替换保存。
/// 保存为整条替换（last-write-wins），不存在部分写入状态。
#[async_trait]
pub trait BookStore: Send + Sync {
    /// 读取全部图书记录
    async fn fetch_all(&self) -> Result<Vec<Book>, StoreError>;

    /// 按 ID 读取单条记录
    async fn fetch(&self, id: &str) -> Result<Option<Book>, StoreError>;

    /// 保存（插入或整条替换）记录
    async fn save(&self, book: &Book) -> Result<(), StoreError>;

    /// 删除记录
    async fn delete(&self, id: &str) -> Result<(), StoreError>;
}

/// 内存图书存储
///
/// 供测试与运行器使用；保持插入顺序以便 fetch_all 的结果可预测。
#[derive(Default)]
pub struct InMemoryBookStore {
    books: RwLock<Vec<Book>>,
}

impl InMemoryBookStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 从已有图书列表构建
    pub fn with_books(books: Vec<Book>) -> Self {
        Self {
            books: RwLock::new(books),
        }
    }
}

#[async_trait]
impl BookStore for InMemoryBookStore {
    async fn fetch_all(&self) -> Result<Vec<Book>, StoreError> {
        Ok(self.books.read().await.clone())
    }

    async fn fetch(&self, id: &str) -> Result<Option<Book>, StoreError> {
        let books = self.books.read().await;
        Ok(books.iter().find(|b| b.id == id).cloned())
    }

    async fn save(&self, book: &Book) -> Result<(), StoreError> {
        let mut books = self.books.write().await;
        match books.iter_mut().find(|b| b.id == book.id) {
            Some(existing) => *existing = book.clone(),
            None => books.push(book.clone()),
        }
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        let mut books = self.books.write().await;
        let before = books.len();
        books.retain(|b| b.id != id);
        if books.len() == before {
            return Err(StoreError::NotFound(id.to_string()));
        }
        Ok(())
    }
}

/// 用户照片文件存储
///
/// 照片以生成的文件名保存在应用私有目录下；文件引用即文件名。
pub struct PhotoStore {
    root: PathBuf,
}

impl PhotoStore {
    /// 创建照片存储
    ///
    /// # 参数
    /// - `root`: 照片存储根目录（不存在时自动创建）
    pub async fn new(root: PathBuf) -> Result<Self, StoreError> {
        fs::create_dir_all(&root).await?;
        Ok(Self { root })
    }

    /// 保存照片字节，返回生成的文件引用
    pub async fn save(&self, bytes: &[u8]) -> Result<String, StoreError> {
        let file_ref = format!("{}.jpg", Uuid::new_v4());
        let path = self.root.join(&file_ref);
        fs::write(&path, bytes).await?;
        debug!("照片已保存: {:?}", path);
        Ok(file_ref)
    }

    /// 读取照片字节
    ///
    /// 文件缺失或损坏等同于"无本地封面"，由调用方回落到远程解析。
    pub async fn read(&self, file_ref: &str) -> Option<Vec<u8>> {
        fs::read(self.root.join(file_ref)).await.ok()
    }

    /// 删除照片文件
    ///
    /// 文件已不存在时视为成功（删除是幂等的）。
    pub async fn delete(&self, file_ref: &str) -> Result<(), StoreError> {
        let path = self.root.join(file_ref);
        match fs::remove_file(&path).await {
            Ok(()) => {
                debug!("照片已删除: {:?}", path);
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StoreError::Io(e)),
        }
    }
}
