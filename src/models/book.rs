// 图书实体与封面记录
//
// 定义图书馆中的图书实体及其内嵌的封面记录，包括：
// - 封面候选 URL 列表的规范化与去重规则
// - 确认可用封面的"置顶"语义
// - 用户照片与远程封面的互斥约束（由 CoverService 执行）

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::services::cover::is_local_url;

/// 图书实体
///
/// UI 层只读取该结构；封面相关字段的变更统一通过 CoverService 进行。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Book {
    /// 图书 ID
    pub id: String,

    /// 书名
    pub title: String,

    /// 作者列表
    #[serde(default)]
    pub authors: Vec<String>,

    /// ISBN（用于推导后备封面 URL）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub isbn: Option<String>,

    /// 封面记录
    #[serde(default)]
    pub cover: CoverRecord,

    /// 入库时间
    pub added_at: DateTime<Utc>,
}

impl Book {
    /// 创建新图书（封面记录为空，候选列表由 CoverService 播种）
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            authors: Vec::new(),
            isbn: None,
            cover: CoverRecord::default(),
            added_at: Utc::now(),
        }
    }
}

/// 封面记录（内嵌于图书实体）
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CoverRecord {
    /// 当前确认可用的远程封面 URL
    ///
    /// 仅在某个候选实际解码成功后写入，且必须位于候选列表首位。
    #[serde(skip_serializing_if = "Option::is_none")]
    pub primary_cover_url: Option<String>,

    /// 候选封面 URL 列表（最优在前，已 HTTPS 规范化并去重）
    #[serde(default)]
    pub candidate_urls: Vec<String>,

    /// 用户上传的全尺寸照片文件引用
    ///
    /// 与远程封面互斥：选定远程封面时由 CoverService 清除并删除底层文件。
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_photo_file_ref: Option<String>,

    /// 同步用缩略图（JPEG 字节，供离线/跨设备显示）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub synced_thumbnail: Option<Vec<u8>>,
}

impl CoverRecord {
    /// 将候选 URL 追加到候选池
    ///
    /// 执行候选列表的全部不变式：
    /// - HTTP 升级为 HTTPS
    /// - 不区分大小写去重（保留首次出现的拼写）
    /// - 丢弃本地文件 URL（候选列表永不指向本地文件）
    ///
    /// # 参数
    /// - `urls`: 待追加的 URL 列表（保持传入顺序）
    pub fn append_candidates<I, S>(&mut self, urls: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for url in urls {
            let url = url.as_ref().trim();
            if url.is_empty() || is_local_url(url) {
                continue;
            }

            let normalized = normalize_https(url);
            let key = normalized.to_lowercase();

            let exists = self
                .candidate_urls
                .iter()
                .any(|existing| existing.to_lowercase() == key);

            if !exists {
                self.candidate_urls.push(normalized);
            }
        }
    }

    /// 将确认可用的 URL 置顶并记为首选封面
    ///
    /// 采用移动到首位语义而非重复插入：若 URL 已在候选列表中
    /// （不区分大小写匹配），先移除原条目再插入首位。
    ///
    /// # 参数
    /// - `url`: 确认解码成功的候选 URL
    pub fn pin_winner(&mut self, url: &str) {
        let key = url.to_lowercase();
        self.candidate_urls
            .retain(|existing| existing.to_lowercase() != key);
        self.candidate_urls.insert(0, url.to_string());
        self.primary_cover_url = Some(url.to_string());
    }
}

/// 将 HTTP URL 升级为 HTTPS，其余原样返回
pub fn normalize_https(url: &str) -> String {
    if let Some(rest) = url.strip_prefix("http://") {
        format!("https://{}", rest)
    } else {
        url.to_string()
    }
}
