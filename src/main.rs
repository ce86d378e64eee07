use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use bookshelf_backend::models::Book;
use bookshelf_backend::services::cover::{
    CoverConfig, CoverResolutionEngine, DiskImageCache, ImageByteFetcher, ImageCodec,
    LibraryBackfillJob, MemoryImageCache, ThumbnailCodec,
};
use bookshelf_backend::store::{BookStore, InMemoryBookStore};

/// 封面回填运行器
///
/// 从 JSON 图书清单加载记录，对缺失或低分辨率缩略图的图书
/// 执行一次回填，并将更新后的清单写回。Ctrl-C 触发协作式取消。
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    // Load environment variables
    dotenv::dotenv().ok();

    let library_path =
        std::env::var("LIBRARY_PATH").unwrap_or_else(|_| "./library.json".to_string());
    let cache_dir = std::env::var("CACHE_DIR").unwrap_or_else(|_| "./cover_cache".to_string());
    let config_path =
        std::env::var("COVER_CONFIG").unwrap_or_else(|_| "./cover_config.json".to_string());

    let config = CoverConfig::load(&config_path).await?;

    // Load library
    let books: Vec<Book> = match tokio::fs::read(&library_path).await {
        Ok(bytes) => serde_json::from_slice(&bytes)?,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            warn!("图书清单不存在，使用空库: {}", library_path);
            Vec::new()
        }
        Err(e) => return Err(e.into()),
    };
    info!("已加载图书清单: {} 条记录", books.len());

    let store: Arc<InMemoryBookStore> = Arc::new(InMemoryBookStore::with_books(books));

    // Build cover pipeline
    let memory = Arc::new(MemoryImageCache::new(config.memory_cache_bytes));
    let disk = Arc::new(DiskImageCache::new(cache_dir.into()).await?);
    let fetcher = Arc::new(ImageByteFetcher::new(
        memory,
        disk,
        Duration::from_secs(config.download_timeout_secs),
    )?);
    let codec: Arc<dyn ThumbnailCodec> = Arc::new(ImageCodec);
    let engine = Arc::new(CoverResolutionEngine::new(
        fetcher,
        codec.clone(),
        config.clone(),
    ));
    let job = LibraryBackfillJob::new(store.clone(), engine, codec, config);

    // Ctrl-C 触发协作式取消
    let cancel = CancellationToken::new();
    let cancel_on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("收到中断信号，回填将在当前批次后退出");
            cancel_on_signal.cancel();
        }
    });

    let stats = job.run_once(&cancel).await?;
    info!(
        "回填结束: 扫描 {} 跳过 {} 刷新 {} 失败 {}",
        stats.scanned, stats.skipped, stats.refreshed, stats.failed
    );

    // Persist updated library
    let updated = store.fetch_all().await?;
    let json = serde_json::to_vec_pretty(&updated)?;
    tokio::fs::write(&library_path, json).await?;
    info!("图书清单已写回: {}", library_path);

    Ok(())
}
