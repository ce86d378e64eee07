// URL 升级器 - 提供商感知的分辨率参数改写
//
// 对已知元数据提供商（Google 图书图片主机）的封面 URL，将 zoom
// 参数只升不降地改写到目标档位的最低级别；其他主机（包括在路径
// 中编码尺寸的 Open Library）原样返回。纯函数，无 I/O。

use std::borrow::Cow;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use url::Url;

/// 封面用途档位
///
/// 决定 URL 升级的最低 zoom 级别和解析结果的最大边长。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoverTarget {
    /// 列表缩略图
    Thumbnail,
    /// 大尺寸展示（详情页等）
    Display,
}

impl CoverTarget {
    /// 该档位要求的最低 zoom 级别
    pub fn min_zoom(&self) -> u32 {
        match self {
            CoverTarget::Thumbnail => 2,
            CoverTarget::Display => 3,
        }
    }
}

/// 判断 URL 是否指向本地文件
///
/// `file://` 协议或不含协议的裸路径均视为本地文件；
/// 本地文件 URL 永远不参与升级，也不进入候选列表。
pub fn is_local_url(url: &str) -> bool {
    url.starts_with("file://") || !url.contains("://")
}

/// 判断主机是否为已知的提供商图片主机
fn is_provider_host(host: &str) -> bool {
    // 使用静态正则表达式，避免重复编译
    static PROVIDER_HOST_REGEX: OnceLock<Regex> = OnceLock::new();

    let regex = PROVIDER_HOST_REGEX.get_or_init(|| {
        // 匹配 books.google.com 及其区域域名、内容分发主机
        Regex::new(r"^books\.google(usercontent)?\.[a-z.]+$")
            .expect("提供商主机正则表达式编译失败")
    });

    regex.is_match(host)
}

/// 将候选 URL 升级到目标档位的最低 zoom 级别
///
/// # 规则
/// - 本地文件 URL：原样返回
/// - 非提供商主机：原样返回
/// - 提供商主机且带 zoom 参数：zoom 低于目标下限时升到下限，
///   其余查询参数保持不变；zoom 已达标时原样返回（只升不降）
/// - 无 zoom 参数或无法解析：原样返回（无从得知提供商语义）
///
/// 该函数是幂等的：`upgrade(upgrade(u, t), t) == upgrade(u, t)`。
///
/// # 示例
/// ```
/// use bookshelf_backend::services::cover::{upgrade, CoverTarget};
///
/// let upgraded = upgrade(
///     "https://books.google.com/books/content?id=abc&zoom=1",
///     CoverTarget::Thumbnail,
/// );
/// assert_eq!(upgraded, "https://books.google.com/books/content?id=abc&zoom=2");
/// ```
pub fn upgrade(url: &str, target: CoverTarget) -> String {
    if is_local_url(url) {
        return url.to_string();
    }

    let mut parsed = match Url::parse(url) {
        Ok(u) => u,
        Err(_) => return url.to_string(),
    };

    let host_matches = parsed
        .host_str()
        .map(is_provider_host)
        .unwrap_or(false);
    if !host_matches {
        return url.to_string();
    }

    let floor = target.min_zoom();

    // 只在存在 zoom 参数且其值低于下限时改写
    let needs_rewrite = parsed.query_pairs().any(|(k, v)| {
        k == "zoom" && v.parse::<u32>().map(|z| z < floor).unwrap_or(false)
    });
    if !needs_rewrite {
        return url.to_string();
    }

    let pairs: Vec<(String, String)> = parsed.query_pairs().into_owned().collect();
    {
        let mut rewritten = parsed.query_pairs_mut();
        rewritten.clear();
        for (key, value) in pairs {
            if key == "zoom" {
                let raised = value
                    .parse::<u32>()
                    .map(|z| z.max(floor))
                    .unwrap_or(floor);
                rewritten.append_pair(&key, &raised.to_string());
            } else {
                rewritten.append_pair(&key, &value);
            }
        }
    }

    parsed.to_string()
}

/// 升级结果与原始 URL 不同时返回升级后的形式
///
/// 解析引擎用它构建尝试列表：升级形式只有在与原始形式不同时才
/// 追加到尝试序列。
pub fn upgraded_if_different(url: &str, target: CoverTarget) -> Option<Cow<'_, str>> {
    let upgraded = upgrade(url, target);
    if upgraded == url {
        None
    } else {
        Some(Cow::Owned(upgraded))
    }
}
