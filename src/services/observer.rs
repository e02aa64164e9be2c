//! 运行观察者
//!
//! 管道把进度事件显式地交给观察者，而不是直接依赖全局日志。
//! 没有观察者时管道行为完全相同。

use std::path::Path;

use tracing::{error, info, warn};

use crate::error::{PersistError, ScrapeError};
use crate::models::EntityRecord;
use crate::services::history_navigator::HistoryOutcome;
use crate::services::persist::OutputFormat;
use crate::workflow::EntityCtx;

/// 运行观察者，所有方法默认什么都不做
pub trait ScrapeObserver: Send + Sync {
    fn on_links_collected(&self, _total: usize, _selected: usize) {}

    fn on_entity_started(&self, _ctx: &EntityCtx) {}

    fn on_entity_completed(&self, _ctx: &EntityCtx, _record: &EntityRecord) {}

    fn on_entity_failed(&self, _ctx: &EntityCtx, _error: &ScrapeError) {}

    fn on_history(&self, _ctx: &EntityCtx, _outcome: &HistoryOutcome) {}

    fn on_format_written(&self, _format: OutputFormat, _path: &Path) {}

    fn on_format_failed(&self, _format: OutputFormat, _error: &PersistError) {}
}

/// 把事件写入 tracing 日志的观察者
#[derive(Debug, Clone)]
pub struct TracingObserver {
    identity_field: String,
    name_field: String,
}

impl TracingObserver {
    /// 进度行显示的两个字段
    pub fn new(identity_field: impl Into<String>, name_field: impl Into<String>) -> Self {
        Self {
            identity_field: identity_field.into(),
            name_field: name_field.into(),
        }
    }
}

impl Default for TracingObserver {
    fn default() -> Self {
        Self::new("symbol", "name")
    }
}

impl ScrapeObserver for TracingObserver {
    fn on_links_collected(&self, total: usize, selected: usize) {
        info!("✓ 索引页共 {} 个链接，本次处理 {} 个", total, selected);
    }

    fn on_entity_started(&self, ctx: &EntityCtx) {
        info!("{} 开始处理: {}", ctx, ctx.url);
    }

    fn on_entity_completed(&self, ctx: &EntityCtx, record: &EntityRecord) {
        info!(
            "{:<3}: {:<6} - {}",
            ctx.index,
            record.get(&self.identity_field).unwrap_or("None"),
            record.get(&self.name_field).unwrap_or("None")
        );
    }

    fn on_entity_failed(&self, ctx: &EntityCtx, error: &ScrapeError) {
        error!("{} ❌ 处理失败: {}", ctx, error);
    }

    fn on_history(&self, ctx: &EntityCtx, outcome: &HistoryOutcome) {
        match outcome {
            HistoryOutcome::Present(record) => {
                info!("{} ✓ 历史记录 {} 行", ctx, record.rows.len())
            }
            HistoryOutcome::NoTab => info!("{} 没有历史标签", ctx),
            HistoryOutcome::Failed(reason) => warn!("{} ⚠️ 历史记录缺失: {}", ctx, reason),
        }
    }

    fn on_format_written(&self, format: OutputFormat, path: &Path) {
        info!("✓ {} 已保存: {}", format, path.display());
    }

    fn on_format_failed(&self, format: OutputFormat, error: &PersistError) {
        error!("❌ {} 保存失败: {}", format, error);
    }
}
