// 封面服务 - 协调解析引擎、照片存储与记录存储
//
// 本模块是封面功能的统一入口，负责：
// - 建书时播种候选 URL 池（元数据候选 + ISBN 后备）
// - 渲染契约：同步给出当前最优的已有字节，异步触发解析
// - 用户操作：上传照片、手动选定在线封面、删除图书的文件清理
// - 远程封面与用户照片的互斥约束

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::external::open_library::fallback_cover_urls;
use crate::models::book::normalize_https;
use crate::models::{Book, BookMetadata};
use crate::services::cover::config::CoverConfig;
use crate::services::cover::error::CoverError;
use crate::services::cover::resolver::CoverResolutionEngine;
use crate::services::cover::thumbnail::{make_thumbnail_async, ThumbnailCodec};
use crate::services::cover::url_upgrader::{is_local_url, CoverTarget};
use crate::store::{BookStore, PhotoStore};

/// 渲染契约给出的封面来源
///
/// 大尺寸显示面优先用户照片；列表默认渲染同步缩略图。
#[derive(Debug, Clone, PartialEq)]
pub enum CoverImage {
    /// 用户上传的全尺寸照片
    UserPhoto(Vec<u8>),
    /// 同步缩略图
    Thumbnail(Vec<u8>),
    /// 无可用封面——渲染占位图
    Placeholder,
}

/// 封面服务
///
/// 记录字段的全部变更都经由本服务进行；保存为整条替换，
/// 重复的在途解析由引擎的请求合并兜底。
#[derive(Clone)]
pub struct CoverService {
    /// 图书记录存储
    store: Arc<dyn BookStore>,

    /// 解析引擎
    engine: Arc<CoverResolutionEngine>,

    /// 用户照片文件存储
    photos: Arc<PhotoStore>,

    /// 缩略图编解码器
    codec: Arc<dyn ThumbnailCodec>,

    /// 流水线配置
    config: CoverConfig,
}

impl CoverService {
    /// 创建封面服务
    pub fn new(
        store: Arc<dyn BookStore>,
        engine: Arc<CoverResolutionEngine>,
        photos: Arc<PhotoStore>,
        codec: Arc<dyn ThumbnailCodec>,
        config: CoverConfig,
    ) -> Self {
        Self {
            store,
            engine,
            photos,
            codec,
            config,
        }
    }

    /// 建书时播种候选 URL 池
    ///
    /// 元数据提供商的候选在前（大尺寸变体在前的顺序由元数据
    /// 客户端保证），ISBN 推导的后备数据库 URL 追加在最后。
    /// 规范化与去重由 CoverRecord 统一执行。
    pub fn seed_candidates(&self, book: &mut Book, metadata: &BookMetadata) {
        book.cover.append_candidates(&metadata.cover_urls);

        if let Some(isbn) = metadata.isbn.as_deref().or(book.isbn.as_deref()) {
            book.cover.append_candidates(fallback_cover_urls(isbn));
        }
    }

    /// 记录是否需要后台刷新
    ///
    /// 缩略图缺失、或其最大边长低于分辨率下限时需要刷新。
    /// 陈旧缩略图照常渲染，刷新永不阻塞显示。
    pub fn needs_refresh(&self, book: &Book) -> bool {
        match &book.cover.synced_thumbnail {
            Some(thumbnail) => self
                .codec
                .is_low_resolution(thumbnail, self.config.low_res_floor),
            None => true,
        }
    }

    /// 渲染契约：同步返回当前最优的已有封面字节
    ///
    /// 优先级：用户照片文件 → 同步缩略图 → 占位图。照片文件
    /// 缺失或损坏等同于"无本地封面"，回落到缩略图。第二个返回
    /// 值指示记录是否需要后台刷新（调用方据此调用
    /// [`CoverService::spawn_refresh`]）。
    pub async fn cover_for_display(&self, book: &Book) -> (CoverImage, bool) {
        if let Some(file_ref) = &book.cover.user_photo_file_ref {
            if let Some(bytes) = self.photos.read(file_ref).await {
                return (CoverImage::UserPhoto(bytes), false);
            }
            debug!("用户照片文件缺失，回落到远程封面: {}", file_ref);
        }

        let stale = self.needs_refresh(book);
        match &book.cover.synced_thumbnail {
            Some(thumbnail) => (CoverImage::Thumbnail(thumbnail.clone()), stale),
            None => (CoverImage::Placeholder, stale),
        }
    }

    /// 解析并持久化某本图书的封面
    ///
    /// 解析成功后重新读取记录再合并封面字段：解析是慢路径，期间
    /// 落地的变更（尤其是用户上传照片）不能被在途的旧副本整条
    /// 覆盖。持久化失败只降级为警告：本次会话的内存状态仍然生效。
    ///
    /// # 返回
    /// - `Ok(true)`: 已刷新并尝试持久化
    /// - `Ok(false)`: 候选耗尽，或记录在解析期间被删除/改为用户照片
    pub async fn refresh_cover(&self, book_id: &str) -> Result<bool, CoverError> {
        let Some(book) = self
            .store
            .fetch(book_id)
            .await
            .map_err(|e| CoverError::Store(e.to_string()))?
        else {
            return Err(CoverError::Store(format!("记录不存在: {}", book_id)));
        };

        let resolved = self
            .engine
            .resolve_for_book(
                book_id,
                &book.cover.candidate_urls,
                book.cover.primary_cover_url.as_deref(),
                CoverTarget::Thumbnail,
            )
            .await;

        let Some(resolved) = resolved else {
            return Ok(false);
        };

        // 重新读取：保存是整条替换，必须基于解析完成时的最新记录
        let Some(mut book) = self
            .store
            .fetch(book_id)
            .await
            .map_err(|e| CoverError::Store(e.to_string()))?
        else {
            debug!("记录在解析期间被删除，放弃刷新: {}", book_id);
            return Ok(false);
        };

        if book.cover.user_photo_file_ref.is_some() {
            // 用户照片在解析期间生效，照片优先于后台解析结果
            debug!("记录已改为用户照片，放弃刷新: {}", book_id);
            return Ok(false);
        }

        book.cover.pin_winner(&resolved.url);
        book.cover.synced_thumbnail = Some(resolved.bytes);

        if let Err(e) = self.store.save(&book).await {
            warn!("封面持久化失败（会话内状态仍生效）: {} - {}", book_id, e);
        }

        Ok(true)
    }

    /// 异步触发封面解析（不阻塞调用方）
    ///
    /// 列表滚动时在"先渲染已有内容"之后调用；解析完成通过
    /// 记录存储的更新反映到 UI。
    pub fn spawn_refresh(&self, book_id: &str) {
        let service = self.clone();
        let book_id = book_id.to_string();

        tokio::spawn(async move {
            match service.refresh_cover(&book_id).await {
                Ok(true) => info!("后台封面刷新完成: {}", book_id),
                Ok(false) => debug!("后台封面刷新无可用候选: {}", book_id),
                Err(e) => warn!("后台封面刷新失败: {} - {}", book_id, e),
            }
        });
    }

    /// 用户手动选定在线封面
    ///
    /// 候选列表的规范化规则同样适用于手动选定：本地路径被拒绝
    /// （候选列表永不指向本地文件），HTTP 升级为 HTTPS 后再解析。
    /// 选定远程封面与用户照片互斥：成功后清除照片引用并删除
    /// 底层文件。
    ///
    /// # 返回
    /// - `Ok(true)`: 选定成功，缩略图已更新
    /// - `Ok(false)`: 该 URL 是本地路径或不可用，记录未变更
    pub async fn select_remote_cover(
        &self,
        book_id: &str,
        url: &str,
    ) -> Result<bool, CoverError> {
        if is_local_url(url) {
            debug!("拒绝本地路径作为在线封面: {}", url);
            return Ok(false);
        }
        let candidates = [normalize_https(url)];

        let Some(mut book) = self
            .store
            .fetch(book_id)
            .await
            .map_err(|e| CoverError::Store(e.to_string()))?
        else {
            return Err(CoverError::Store(format!("记录不存在: {}", book_id)));
        };

        let resolved = self
            .engine
            .resolve_and_thumbnail(&candidates, None, CoverTarget::Thumbnail)
            .await;

        let Some(resolved) = resolved else {
            return Ok(false);
        };

        if let Some(file_ref) = book.cover.user_photo_file_ref.take() {
            self.photos
                .delete(&file_ref)
                .await
                .map_err(|e| CoverError::Store(e.to_string()))?;
        }

        book.cover.pin_winner(&resolved.url);
        book.cover.synced_thumbnail = Some(resolved.bytes);

        self.store
            .save(&book)
            .await
            .map_err(|e| CoverError::Store(e.to_string()))?;

        info!("已选定在线封面: {} -> {}", book_id, resolved.url);
        Ok(true)
    }

    /// 用户上传封面照片
    ///
    /// 全尺寸存档只做重编码与方向归一化（不降采样），同步缩略图
    /// 从同一来源生成；上传照片与远程封面互斥，成功后清除首选
    /// 远程封面。
    pub async fn set_user_photo(
        &self,
        book_id: &str,
        photo_bytes: Vec<u8>,
    ) -> Result<(), CoverError> {
        let Some(mut book) = self
            .store
            .fetch(book_id)
            .await
            .map_err(|e| CoverError::Store(e.to_string()))?
        else {
            return Err(CoverError::Store(format!("记录不存在: {}", book_id)));
        };

        // 全尺寸存档（质量 photo_quality，无降采样）
        let archived = make_thumbnail_async(
            self.codec.clone(),
            photo_bytes.clone(),
            None,
            self.config.photo_quality,
        )
        .await?;

        // 同步缩略图（质量 thumbnail_quality，限定最大边长）
        let thumbnail = make_thumbnail_async(
            self.codec.clone(),
            photo_bytes,
            Some(self.config.thumbnail_max_edge),
            self.config.thumbnail_quality,
        )
        .await?;

        let file_ref = self
            .photos
            .save(&archived)
            .await
            .map_err(|e| CoverError::Store(e.to_string()))?;

        // 替换旧照片时删除其底层文件
        if let Some(old_ref) = book.cover.user_photo_file_ref.take() {
            if let Err(e) = self.photos.delete(&old_ref).await {
                warn!("旧照片删除失败: {} - {}", old_ref, e);
            }
        }

        book.cover.user_photo_file_ref = Some(file_ref);
        book.cover.primary_cover_url = None;
        book.cover.synced_thumbnail = Some(thumbnail);

        self.store
            .save(&book)
            .await
            .map_err(|e| CoverError::Store(e.to_string()))?;

        info!("用户照片已设置: {}", book_id);
        Ok(())
    }

    /// 移除用户照片（回到远程封面/占位图）
    pub async fn remove_user_photo(&self, book_id: &str) -> Result<(), CoverError> {
        let Some(mut book) = self
            .store
            .fetch(book_id)
            .await
            .map_err(|e| CoverError::Store(e.to_string()))?
        else {
            return Err(CoverError::Store(format!("记录不存在: {}", book_id)));
        };

        if let Some(file_ref) = book.cover.user_photo_file_ref.take() {
            self.photos
                .delete(&file_ref)
                .await
                .map_err(|e| CoverError::Store(e.to_string()))?;
            self.store
                .save(&book)
                .await
                .map_err(|e| CoverError::Store(e.to_string()))?;
        }

        Ok(())
    }

    /// 删除图书及其本地封面资产
    pub async fn delete_book(&self, book_id: &str) -> Result<(), CoverError> {
        if let Ok(Some(book)) = self.store.fetch(book_id).await {
            if let Some(file_ref) = &book.cover.user_photo_file_ref {
                if let Err(e) = self.photos.delete(file_ref).await {
                    warn!("图书照片清理失败: {} - {}", file_ref, e);
                }
            }
        }

        self.store
            .delete(book_id)
            .await
            .map_err(|e| CoverError::Store(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Cursor;
    use std::time::Duration;

    use async_trait::async_trait;
    use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
    use tempfile::TempDir;

    use crate::services::cover::error::{CoverError as FetchError, DownloadError};
    use crate::services::cover::fetcher::ByteFetcher;
    use crate::services::cover::thumbnail::ImageCodec;
    use crate::store::InMemoryBookStore;

    struct MapFetcher {
        responses: HashMap<String, Vec<u8>>,
        delay: Option<Duration>,
    }

    #[async_trait]
    impl ByteFetcher for MapFetcher {
        async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            self.responses
                .get(url)
                .cloned()
                .ok_or(FetchError::Download(DownloadError::HttpStatus(404)))
        }
    }

    fn create_test_png(width: u32, height: u32) -> Vec<u8> {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(
            width,
            height,
            Rgb([80, 80, 80]),
        ));
        let mut buffer = Vec::new();
        img.write_to(&mut Cursor::new(&mut buffer), ImageFormat::Png)
            .unwrap();
        buffer
    }

    async fn create_service_delayed(
        responses: HashMap<String, Vec<u8>>,
        delay: Option<Duration>,
    ) -> (CoverService, Arc<InMemoryBookStore>, Arc<PhotoStore>, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let store = Arc::new(InMemoryBookStore::new());
        let photos = Arc::new(
            PhotoStore::new(temp_dir.path().join("photos")).await.unwrap(),
        );
        let codec: Arc<dyn ThumbnailCodec> = Arc::new(ImageCodec);
        let config = CoverConfig::default();

        let engine = Arc::new(CoverResolutionEngine::new(
            Arc::new(MapFetcher { responses, delay }),
            codec.clone(),
            config.clone(),
        ));

        let service = CoverService::new(
            store.clone(),
            engine,
            photos.clone(),
            codec,
            config,
        );
        (service, store, photos, temp_dir)
    }

    async fn create_service(
        responses: HashMap<String, Vec<u8>>,
    ) -> (CoverService, Arc<InMemoryBookStore>, Arc<PhotoStore>, TempDir) {
        create_service_delayed(responses, None).await
    }

    #[tokio::test]
    async fn test_seed_candidates_appends_fallback_last() {
        let (service, _store, _photos, _tmp) = create_service(HashMap::new()).await;

        let mut book = Book::new("book-1", "测试");
        let metadata = BookMetadata {
            title: "测试".to_string(),
            authors: vec![],
            isbn: Some("9780000000000".to_string()),
            cover_urls: vec![
                "http://example.com/Large.jpg".to_string(),
                "https://example.com/large.jpg".to_string(),
                "https://example.com/small.jpg".to_string(),
            ],
        };

        service.seed_candidates(&mut book, &metadata);

        assert_eq!(
            book.cover.candidate_urls,
            vec![
                // HTTPS 升级 + 不区分大小写去重
                "https://example.com/Large.jpg",
                "https://example.com/small.jpg",
                "https://covers.openlibrary.org/b/isbn/9780000000000-L.jpg?default=false",
                "https://covers.openlibrary.org/b/isbn/9780000000000-M.jpg?default=false",
                "https://covers.openlibrary.org/b/isbn/9780000000000-S.jpg?default=false",
            ]
        );
    }

    #[tokio::test]
    async fn test_refresh_cover_pins_winner() {
        let url = "https://example.com/cover.jpg";
        let mut responses = HashMap::new();
        responses.insert(url.to_string(), create_test_png(800, 1200));

        let (service, store, _photos, _tmp) = create_service(responses).await;

        let mut book = Book::new("book-1", "测试");
        book.cover.append_candidates([
            "https://dead.example.com/missing.jpg",
            url,
        ]);
        store.save(&book).await.unwrap();

        let refreshed = service.refresh_cover("book-1").await.unwrap();
        assert!(refreshed);

        let saved = store.fetch("book-1").await.unwrap().unwrap();
        assert_eq!(saved.cover.primary_cover_url.as_deref(), Some(url));
        assert_eq!(saved.cover.candidate_urls[0], url);
        assert!(saved.cover.synced_thumbnail.is_some());
    }

    #[tokio::test]
    async fn test_refresh_cover_exhaustion_returns_false() {
        let (service, store, _photos, _tmp) = create_service(HashMap::new()).await;

        let mut book = Book::new("book-1", "测试");
        book.cover.append_candidates(["https://dead.example.com/a.jpg"]);
        store.save(&book).await.unwrap();

        let refreshed = service.refresh_cover("book-1").await.unwrap();
        assert!(!refreshed);

        let saved = store.fetch("book-1").await.unwrap().unwrap();
        assert!(saved.cover.synced_thumbnail.is_none());
        assert!(saved.cover.primary_cover_url.is_none());
    }

    #[tokio::test]
    async fn test_cover_for_display_precedence() {
        let (service, store, photos, _tmp) = create_service(HashMap::new()).await;

        // 无任何来源：占位图，需要刷新
        let book = Book::new("book-1", "测试");
        let (image, stale) = service.cover_for_display(&book).await;
        assert_eq!(image, CoverImage::Placeholder);
        assert!(stale);

        // 有缩略图：渲染缩略图
        let mut book = Book::new("book-2", "测试");
        book.cover.synced_thumbnail = Some(create_test_png(500, 700));
        let (image, stale) = service.cover_for_display(&book).await;
        assert!(matches!(image, CoverImage::Thumbnail(_)));
        assert!(!stale);

        // 有照片文件：照片优先
        let file_ref = photos.save(b"photo-bytes").await.unwrap();
        book.cover.user_photo_file_ref = Some(file_ref);
        store.save(&book).await.unwrap();
        let (image, _) = service.cover_for_display(&book).await;
        assert_eq!(image, CoverImage::UserPhoto(b"photo-bytes".to_vec()));
    }

    #[tokio::test]
    async fn test_cover_for_display_missing_photo_falls_back() {
        let (service, _store, _photos, _tmp) = create_service(HashMap::new()).await;

        let mut book = Book::new("book-1", "测试");
        book.cover.user_photo_file_ref = Some("missing.jpg".to_string());
        book.cover.synced_thumbnail = Some(create_test_png(500, 700));

        let (image, _) = service.cover_for_display(&book).await;
        assert!(matches!(image, CoverImage::Thumbnail(_)));
    }

    #[tokio::test]
    async fn test_stale_thumbnail_still_renders() {
        let (service, _store, _photos, _tmp) = create_service(HashMap::new()).await;

        // 低分辨率缩略图：照常渲染，但标记需要刷新
        let mut book = Book::new("book-1", "测试");
        book.cover.synced_thumbnail = Some(create_test_png(200, 300));

        let (image, stale) = service.cover_for_display(&book).await;
        assert!(matches!(image, CoverImage::Thumbnail(_)));
        assert!(stale);
    }

    #[tokio::test]
    async fn test_select_remote_cover_clears_user_photo() {
        let url = "https://example.com/new-cover.jpg";
        let mut responses = HashMap::new();
        responses.insert(url.to_string(), create_test_png(800, 1200));

        let (service, store, photos, _tmp) = create_service(responses).await;

        // 先设置用户照片
        let mut book = Book::new("book-1", "测试");
        let file_ref = photos.save(b"old-photo").await.unwrap();
        book.cover.user_photo_file_ref = Some(file_ref.clone());
        store.save(&book).await.unwrap();

        let selected = service.select_remote_cover("book-1", url).await.unwrap();
        assert!(selected);

        let saved = store.fetch("book-1").await.unwrap().unwrap();
        // 互斥：照片引用清除、底层文件删除、缩略图来自新封面
        assert!(saved.cover.user_photo_file_ref.is_none());
        assert!(photos.read(&file_ref).await.is_none());
        assert_eq!(saved.cover.primary_cover_url.as_deref(), Some(url));
        assert!(saved.cover.synced_thumbnail.is_some());
    }

    #[tokio::test]
    async fn test_select_remote_cover_failure_leaves_record_unchanged() {
        let (service, store, photos, _tmp) = create_service(HashMap::new()).await;

        let mut book = Book::new("book-1", "测试");
        let file_ref = photos.save(b"photo").await.unwrap();
        book.cover.user_photo_file_ref = Some(file_ref.clone());
        store.save(&book).await.unwrap();

        let selected = service
            .select_remote_cover("book-1", "https://dead.example.com/x.jpg")
            .await
            .unwrap();
        assert!(!selected);

        // 失败时照片保持原样
        let saved = store.fetch("book-1").await.unwrap().unwrap();
        assert_eq!(saved.cover.user_photo_file_ref, Some(file_ref.clone()));
        assert!(photos.read(&file_ref).await.is_some());
    }

    #[tokio::test]
    async fn test_select_remote_cover_rejects_local_path() {
        let (service, store, _photos, temp_dir) = create_service(HashMap::new()).await;

        // 磁盘上真实存在的本地图片文件
        let local_path = temp_dir.path().join("local.png");
        tokio::fs::write(&local_path, create_test_png(800, 1200))
            .await
            .unwrap();

        store.save(&Book::new("book-1", "测试")).await.unwrap();

        // 裸路径与 file:// 形式都在解析前被拒绝
        let selected = service
            .select_remote_cover("book-1", local_path.to_str().unwrap())
            .await
            .unwrap();
        assert!(!selected);

        let selected = service
            .select_remote_cover("book-1", &format!("file://{}", local_path.display()))
            .await
            .unwrap();
        assert!(!selected);

        // 记录未变更：候选列表永不指向本地文件
        let saved = store.fetch("book-1").await.unwrap().unwrap();
        assert!(saved.cover.candidate_urls.is_empty());
        assert!(saved.cover.primary_cover_url.is_none());
        assert!(saved.cover.synced_thumbnail.is_none());
    }

    #[tokio::test]
    async fn test_select_remote_cover_normalizes_http() {
        let https_url = "https://example.com/cover.jpg";
        let mut responses = HashMap::new();
        responses.insert(https_url.to_string(), create_test_png(800, 1200));

        let (service, store, _photos, _tmp) = create_service(responses).await;
        store.save(&Book::new("book-1", "测试")).await.unwrap();

        // HTTP 形式在解析与置顶前升级为 HTTPS
        let selected = service
            .select_remote_cover("book-1", "http://example.com/cover.jpg")
            .await
            .unwrap();
        assert!(selected);

        let saved = store.fetch("book-1").await.unwrap().unwrap();
        assert_eq!(saved.cover.primary_cover_url.as_deref(), Some(https_url));
        assert_eq!(saved.cover.candidate_urls, vec![https_url]);
    }

    #[tokio::test]
    async fn test_refresh_does_not_clobber_concurrent_photo() {
        let url = "https://example.com/cover.jpg";
        let mut responses = HashMap::new();
        responses.insert(url.to_string(), create_test_png(800, 1200));

        // 慢速获取：照片上传落在解析在途期间（延迟需覆盖
        // 调试构建下照片重编码的耗时，取足够宽的窗口）
        let (service, store, photos, _tmp) =
            create_service_delayed(responses, Some(Duration::from_secs(10))).await;

        let mut book = Book::new("book-1", "测试");
        book.cover.append_candidates([url]);
        store.save(&book).await.unwrap();

        let refresh = {
            let service = service.clone();
            tokio::spawn(async move { service.refresh_cover("book-1").await })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;
        service
            .set_user_photo("book-1", create_test_png(900, 1400))
            .await
            .unwrap();

        // 解析完成后放弃刷新，不覆盖期间落地的照片
        let refreshed = refresh.await.unwrap().unwrap();
        assert!(!refreshed);

        let saved = store.fetch("book-1").await.unwrap().unwrap();
        let file_ref = saved.cover.user_photo_file_ref.expect("照片引用被旧副本覆盖");
        assert!(photos.read(&file_ref).await.is_some());
        assert!(saved.cover.primary_cover_url.is_none());
    }

    #[tokio::test]
    async fn test_set_user_photo_clears_remote_cover() {
        let (service, store, photos, _tmp) = create_service(HashMap::new()).await;

        let mut book = Book::new("book-1", "测试");
        book.cover.append_candidates(["https://example.com/cover.jpg"]);
        book.cover.primary_cover_url = Some("https://example.com/cover.jpg".to_string());
        store.save(&book).await.unwrap();

        let photo = create_test_png(900, 1400);
        service.set_user_photo("book-1", photo).await.unwrap();

        let saved = store.fetch("book-1").await.unwrap().unwrap();
        assert!(saved.cover.primary_cover_url.is_none());
        // 候选列表保留，便于之后撤销照片后恢复远程解析
        assert!(!saved.cover.candidate_urls.is_empty());

        let file_ref = saved.cover.user_photo_file_ref.unwrap();
        let archived = photos.read(&file_ref).await.unwrap();

        // 全尺寸存档不降采样
        let codec = ImageCodec;
        assert_eq!(codec.probe_dimensions(&archived).unwrap(), (900, 1400));

        // 同步缩略图限定最大边长
        let thumbnail = saved.cover.synced_thumbnail.unwrap();
        let (w, h) = codec.probe_dimensions(&thumbnail).unwrap();
        assert!(w.max(h) <= 600);
    }

    #[tokio::test]
    async fn test_set_user_photo_replaces_old_file() {
        let (service, store, photos, _tmp) = create_service(HashMap::new()).await;

        store.save(&Book::new("book-1", "测试")).await.unwrap();

        service
            .set_user_photo("book-1", create_test_png(400, 600))
            .await
            .unwrap();
        let first_ref = store
            .fetch("book-1")
            .await
            .unwrap()
            .unwrap()
            .cover
            .user_photo_file_ref
            .unwrap();

        service
            .set_user_photo("book-1", create_test_png(500, 700))
            .await
            .unwrap();

        // 旧文件删除，新引用生效
        assert!(photos.read(&first_ref).await.is_none());
        let second_ref = store
            .fetch("book-1")
            .await
            .unwrap()
            .unwrap()
            .cover
            .user_photo_file_ref
            .unwrap();
        assert_ne!(first_ref, second_ref);
    }

    #[tokio::test]
    async fn test_delete_book_cleans_photo_file() {
        let (service, store, photos, _tmp) = create_service(HashMap::new()).await;

        let mut book = Book::new("book-1", "测试");
        let file_ref = photos.save(b"photo").await.unwrap();
        book.cover.user_photo_file_ref = Some(file_ref.clone());
        store.save(&book).await.unwrap();

        service.delete_book("book-1").await.unwrap();

        assert!(store.fetch("book-1").await.unwrap().is_none());
        assert!(photos.read(&file_ref).await.is_none());
    }
}
