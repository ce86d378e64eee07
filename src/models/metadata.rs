// 图书元数据
//
// 元数据搜索客户端返回的值对象。搜索与排序逻辑本身属于外部协作者，
// 本库只消费其产出的候选封面 URL 列表。

use serde::{Deserialize, Serialize};

/// 元数据搜索结果中的单条图书元数据
///
/// `cover_urls` 为最优在前的候选封面列表（大尺寸变体在前），
/// 由 CoverService 播种进图书的封面记录。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BookMetadata {
    /// 书名
    pub title: String,

    /// 作者列表
    #[serde(default)]
    pub authors: Vec<String>,

    /// ISBN
    #[serde(skip_serializing_if = "Option::is_none")]
    pub isbn: Option<String>,

    /// 候选封面 URL（最优在前，覆盖多个分辨率档位）
    #[serde(default)]
    pub cover_urls: Vec<String>,
}
