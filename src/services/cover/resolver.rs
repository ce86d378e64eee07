// 封面解析引擎 - 按序尝试候选 URL，返回首个可用的缩略图
//
// 给定图书的有序候选列表与可选的首选 URL，按"原始形式先于升级
// 形式"的顺序逐个尝试：某些提供商在更高 zoom 级别会返回一张有效
// 但内容为"暂无封面"的占位图，而未改写的 URL 返回真实封面——
// 先试升级形式有把占位图永久缓存下来的风险。
//
// 单个候选的获取/解码失败是预期的常态控制流，静默推进到下一个
// 候选；只有候选全部耗尽才向调用方返回"无封面"。

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, OnceCell};
use tracing::{debug, info};

use crate::services::cover::config::CoverConfig;
use crate::services::cover::fetcher::ByteFetcher;
use crate::services::cover::thumbnail::{make_thumbnail_async, ThumbnailCodec};
use crate::services::cover::url_upgrader::{upgraded_if_different, CoverTarget};

/// 解析成功的结果
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedCover {
    /// 编码后的缩略图字节（JPEG）
    pub bytes: Vec<u8>,

    /// 实际成功的 URL（原始或升级形式）
    pub url: String,
}

/// 封面解析引擎
pub struct CoverResolutionEngine {
    /// 字节获取器（分层缓存 + 网络）
    fetcher: Arc<dyn ByteFetcher>,

    /// 缩略图编解码器
    codec: Arc<dyn ThumbnailCodec>,

    /// 流水线配置
    config: CoverConfig,

    /// 每本图书的在途解析（请求合并：并发调用等待同一次尝试）
    in_flight: Mutex<HashMap<String, Arc<OnceCell<Option<ResolvedCover>>>>>,
}

impl CoverResolutionEngine {
    /// 创建解析引擎
    pub fn new(
        fetcher: Arc<dyn ByteFetcher>,
        codec: Arc<dyn ThumbnailCodec>,
        config: CoverConfig,
    ) -> Self {
        Self {
            fetcher,
            codec,
            config,
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    /// 构建尝试列表
    ///
    /// 首选 URL（若给出且在候选列表中）移到最前，随后对每个候选
    /// 先列原始形式，升级形式只有在与原始不同的情况下才追加。
    /// 候选内的顺序是正确性要求（占位图规避），候选之间的顺序
    /// 是最优在前。
    fn build_attempt_list(
        candidates: &[String],
        preferred: Option<&str>,
        target: CoverTarget,
    ) -> Vec<String> {
        let mut ordered: Vec<&str> = Vec::with_capacity(candidates.len());

        if let Some(preferred) = preferred {
            ordered.push(preferred);
        }
        for candidate in candidates {
            let dup = ordered
                .iter()
                .any(|u| u.eq_ignore_ascii_case(candidate));
            if !dup {
                ordered.push(candidate);
            }
        }

        let mut attempts = Vec::with_capacity(ordered.len() * 2);
        for url in ordered {
            attempts.push(url.to_string());
            if let Some(upgraded) = upgraded_if_different(url, target) {
                attempts.push(upgraded.into_owned());
            }
        }
        attempts
    }

    /// 目标档位对应的输出最大边长
    fn max_edge_for(&self, target: CoverTarget) -> u32 {
        match target {
            CoverTarget::Thumbnail => self.config.thumbnail_max_edge,
            CoverTarget::Display => self.config.display_max_edge,
        }
    }

    /// 按序尝试候选并生成缩略图
    ///
    /// # 参数
    /// - `candidates`: 有序候选 URL 列表（最优在前）
    /// - `preferred`: 可选的首选 URL（上次确认可用的封面）
    /// - `target`: 用途档位
    ///
    /// # 返回
    /// - `Some(ResolvedCover)`: 首个成功解码并编码的结果
    /// - `None`: 候选全部耗尽——调用方渲染占位图
    pub async fn resolve_and_thumbnail(
        &self,
        candidates: &[String],
        preferred: Option<&str>,
        target: CoverTarget,
    ) -> Option<ResolvedCover> {
        let attempts = Self::build_attempt_list(candidates, preferred, target);
        let max_edge = self.max_edge_for(target);

        for url in attempts {
            let bytes = match self.fetcher.fetch(&url).await {
                Ok(bytes) => bytes,
                Err(e) => {
                    debug!("候选获取失败，尝试下一个: {} - {}", url, e);
                    continue;
                }
            };

            match make_thumbnail_async(
                self.codec.clone(),
                bytes,
                Some(max_edge),
                self.config.thumbnail_quality,
            )
            .await
            {
                Ok(thumbnail) => {
                    info!("封面解析成功: {}", url);
                    return Some(ResolvedCover {
                        bytes: thumbnail,
                        url,
                    });
                }
                Err(e) => {
                    debug!("候选解码失败，尝试下一个: {} - {}", url, e);
                    continue;
                }
            }
        }

        debug!("候选全部耗尽，无可用封面");
        None
    }

    /// 针对某本图书的解析（并发调用合并为同一次尝试）
    ///
    /// 同一图书的并发解析请求共享一个在途任务，避免重复网络
    /// 获取；任务完成后移除在途记录，之后的请求重新发起尝试。
    pub async fn resolve_for_book(
        &self,
        book_id: &str,
        candidates: &[String],
        preferred: Option<&str>,
        target: CoverTarget,
    ) -> Option<ResolvedCover> {
        let cell = {
            let mut in_flight = self.in_flight.lock().await;
            in_flight
                .entry(book_id.to_string())
                .or_insert_with(|| Arc::new(OnceCell::new()))
                .clone()
        };

        let result = cell
            .get_or_init(|| self.resolve_and_thumbnail(candidates, preferred, target))
            .await
            .clone();

        self.in_flight.lock().await.remove(book_id);

        result
    }
}
