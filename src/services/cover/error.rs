// 封面模块错误类型定义
//
// 定义封面解析流水线中可能出现的各种错误类型。
// 单个候选 URL 的失败是预期的常态（聚合元数据中死链很常见），
// 在解析引擎内部以"尝试下一个"处理，不向上传播。

use thiserror::Error;

/// 封面操作的统一错误类型
#[derive(Debug, Error)]
pub enum CoverError {
    #[error("下载错误: {0}")]
    Download(#[from] DownloadError),

    #[error("缩略图错误: {0}")]
    Thumbnail(#[from] ThumbnailError),

    #[error("存储错误: {0}")]
    Store(String),

    #[error("配置错误: {0}")]
    Config(String),

    #[error("IO 错误: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON 序列化错误: {0}")]
    Json(#[from] serde_json::Error),
}

/// 下载相关错误
#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("网络错误: {0}")]
    NetworkError(String),

    #[error("下载超时")]
    Timeout,

    #[error("无效的 URL: {0}")]
    InvalidUrl(String),

    #[error("HTTP 错误: 状态码 {0}")]
    HttpStatus(u16),
}

impl From<reqwest::Error> for DownloadError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            DownloadError::Timeout
        } else {
            DownloadError::NetworkError(e.to_string())
        }
    }
}

/// 缩略图生成相关错误
#[derive(Debug, Error)]
pub enum ThumbnailError {
    #[error("不支持的图片格式: {0}")]
    UnsupportedFormat(String),

    #[error("图片解码失败: {0}")]
    DecodeFailed(String),

    #[error("图片编码失败: {0}")]
    EncodeFailed(String),

    #[error("图片数据损坏")]
    CorruptedData,

    #[error("任务执行失败: {0}")]
    TaskFailed(String),
}
