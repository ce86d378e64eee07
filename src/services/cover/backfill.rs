// 库级封面回填任务 - 为存量图书批量补齐缩略图
//
// 扫描全部记录，跳过已有合格缩略图的图书，其余按小批量顺序
// 解析，批间停顿以让出资源。任务是幂等的：全部补齐后再次运行
// 不产生任何网络获取。

use std::sync::Arc;

use tokio::time::{sleep, Duration};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::services::cover::config::CoverConfig;
use crate::services::cover::error::CoverError;
use crate::services::cover::resolver::CoverResolutionEngine;
use crate::services::cover::thumbnail::ThumbnailCodec;
use crate::services::cover::url_upgrader::CoverTarget;
use crate::store::BookStore;

/// 单次回填运行的统计
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BackfillStats {
    /// 扫描的记录总数
    pub scanned: usize,

    /// 已有合格缩略图、跳过的记录数
    pub skipped: usize,

    /// 本次成功补齐/刷新缩略图的记录数
    pub refreshed: usize,

    /// 候选耗尽、未能补齐的记录数
    pub failed: usize,
}

/// 库级封面回填任务
pub struct LibraryBackfillJob {
    /// 图书记录存储
    store: Arc<dyn BookStore>,

    /// 解析引擎
    engine: Arc<CoverResolutionEngine>,

    /// 缩略图编解码器（用于跳过检查的尺寸探测）
    codec: Arc<dyn ThumbnailCodec>,

    /// 流水线配置
    config: CoverConfig,
}

impl LibraryBackfillJob {
    /// 创建回填任务
    pub fn new(
        store: Arc<dyn BookStore>,
        engine: Arc<CoverResolutionEngine>,
        codec: Arc<dyn ThumbnailCodec>,
        config: CoverConfig,
    ) -> Self {
        Self {
            store,
            engine,
            codec,
            config,
        }
    }

    /// 记录是否需要补齐
    ///
    /// 跳过检查只读缩略图元数据，每条记录的开销是常数级的，
    /// 不触发任何获取。
    fn needs_backfill(&self, thumbnail: Option<&Vec<u8>>) -> bool {
        match thumbnail {
            Some(bytes) => self
                .codec
                .is_low_resolution(bytes, self.config.low_res_floor),
            None => true,
        }
    }

    /// 执行一次回填扫描
    ///
    /// 协作式取消：批与批之间检查取消令牌，当前批的在途工作
    /// 正常收尾后干净退出，已完成的记录保持已持久化状态。
    ///
    /// # 参数
    /// - `cancel`: 取消令牌（上层生命周期事件触发）
    pub async fn run_once(
        &self,
        cancel: &CancellationToken,
    ) -> Result<BackfillStats, CoverError> {
        let books = self
            .store
            .fetch_all()
            .await
            .map_err(|e| CoverError::Store(e.to_string()))?;

        let mut stats = BackfillStats {
            scanned: books.len(),
            ..Default::default()
        };

        let pending: Vec<_> = books
            .into_iter()
            .filter(|book| {
                if self.needs_backfill(book.cover.synced_thumbnail.as_ref()) {
                    true
                } else {
                    stats.skipped += 1;
                    false
                }
            })
            .collect();

        if pending.is_empty() {
            debug!("回填扫描完成，无需补齐: 共 {} 条记录", stats.scanned);
            return Ok(stats);
        }

        info!("回填开始: {} 条记录待补齐", pending.len());

        let batch_size = self.config.backfill_batch_size.max(1);
        let delay = Duration::from_millis(self.config.backfill_batch_delay_ms);

        for (index, batch) in pending.chunks(batch_size).enumerate() {
            if cancel.is_cancelled() {
                info!("回填已取消: 剩余记录留待下次运行");
                return Ok(stats);
            }

            // 批间停顿 + 让出调度，避免独占前台资源
            if index > 0 {
                sleep(delay).await;
                tokio::task::yield_now().await;
            }

            for book in batch {
                let resolved = self
                    .engine
                    .resolve_for_book(
                        &book.id,
                        &book.cover.candidate_urls,
                        book.cover.primary_cover_url.as_deref(),
                        CoverTarget::Thumbnail,
                    )
                    .await;

                match resolved {
                    Some(resolved) => {
                        let mut updated = book.clone();
                        updated.cover.pin_winner(&resolved.url);
                        updated.cover.synced_thumbnail = Some(resolved.bytes);

                        if let Err(e) = self.store.save(&updated).await {
                            warn!("回填持久化失败: {} - {}", book.id, e);
                        }
                        stats.refreshed += 1;
                    }
                    None => {
                        // 候选耗尽不是异常；留待候选池变化后重试
                        debug!("回填无可用候选: {}", book.id);
                        stats.failed += 1;
                    }
                }
            }
        }

        info!(
            "回填完成: 扫描 {} 跳过 {} 刷新 {} 失败 {}",
            stats.scanned, stats.skipped, stats.refreshed, stats.failed
        );
        Ok(stats)
    }
}
