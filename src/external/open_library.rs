// Open Library 封面后备数据库
//
// 根据 ISBN 推导后备封面 URL。Open Library 在路径中编码尺寸
// （L/M/S），并通过 `default=false` 参数要求未命中时返回 404
// 而不是其通用占位图。

/// Open Library 封面服务主机
pub const FALLBACK_COVER_HOST: &str = "covers.openlibrary.org";

/// 根据 ISBN 推导后备封面 URL 列表（大图优先）
///
/// # 参数
/// - `isbn`: 图书 ISBN（允许包含连字符，推导前会清理）
///
/// # 返回
/// 按 Large、Medium、Small 顺序排列的 URL 列表；ISBN 清理后为空
/// 时返回空列表。
///
/// # 示例
/// ```
/// use bookshelf_backend::external::open_library::fallback_cover_urls;
///
/// let urls = fallback_cover_urls("978-0-00-000000-0");
/// assert_eq!(
///     urls[0],
///     "https://covers.openlibrary.org/b/isbn/9780000000000-L.jpg?default=false"
/// );
/// assert_eq!(urls.len(), 3);
/// ```
pub fn fallback_cover_urls(isbn: &str) -> Vec<String> {
    let cleaned: String = isbn
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect();

    if cleaned.is_empty() {
        return Vec::new();
    }

    ["L", "M", "S"]
        .iter()
        .map(|size| {
            format!(
                "https://{}/b/isbn/{}-{}.jpg?default=false",
                FALLBACK_COVER_HOST, cleaned, size
            )
        })
        .collect()
}
