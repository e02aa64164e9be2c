//! 应用入口 - 编排层
//!
//! ## 职责
//!
//! 1. **应用初始化**：打印启动信息、加载页面布局、启动或连接浏览器
//! 2. **运行流水线**：把 `ChromiumAccessor` 借给 `ScrapePipeline`
//! 3. **持久化**：数据集写出多种格式，历史记录逐个写出
//! 4. **资源管理**：唯一持有 Browser 的模块，结束时关闭浏览器
//! 5. **全局统计**：输出最终统计

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use chromiumoxide::Browser;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::browser;
use crate::config::Config;
use crate::error::ScrapeError;
use crate::infrastructure::ChromiumAccessor;
use crate::models::{load_layout_or_default, HistoryRecord, PageLayout};
use crate::orchestrator::pipeline::{RunOutcome, ScrapePipeline};
use crate::services::{write_history, Persister, ScrapeObserver, TracingObserver};
use crate::utils::{log_startup, print_final_stats, RunStats};

/// 应用主结构
pub struct App {
    config: Config,
    layout: PageLayout,
    browser: Browser,
    accessor: ChromiumAccessor,
    observer: Arc<dyn ScrapeObserver>,
}

impl App {
    /// 初始化应用
    pub async fn initialize(config: Config) -> Result<Self> {
        log_startup(&config);

        let layout = load_layout_or_default(config.layout_file.as_deref())
            .await
            .context("加载页面布局失败")?;

        let (browser, page) = browser::open_browser(&config).await?;
        let accessor = ChromiumAccessor::new(page);

        let observer: Arc<dyn ScrapeObserver> = Arc::new(TracingObserver::new(
            layout.identity_field.clone(),
            layout.name_field.clone(),
        ));

        Ok(Self {
            config,
            layout,
            browser,
            accessor,
            observer,
        })
    }

    /// 运行应用主逻辑
    ///
    /// 会话丢失或页面结构不符时返回错误（已完成实体列在日志中），
    /// 被取消时仍保存已完成的实体。
    pub async fn run(&self, cancel: CancellationToken) -> Result<RunStats> {
        let mut pipeline = ScrapePipeline::new(
            self.config.index_url.clone(),
            self.layout.clone(),
            self.config.settle_strategy(),
        )
        .with_limit(self.config.entity_limit())
        .with_history(self.config.history_enabled)
        .with_observer(self.observer.clone())
        .with_cancellation(cancel);
        if self.config.snapshot_failed_pages {
            pipeline = pipeline.with_snapshot_dir(self.config.output_path());
        }

        let outcome = match pipeline.run(&self.accessor).await {
            Ok(outcome) => outcome,
            Err(ScrapeError::Aborted { completed, source }) => {
                error!("❌ 运行终止: {}", source);
                error!("终止前已完成 {} 个实体:", completed.len());
                for url in &completed {
                    error!("  - {}", url);
                }
                return Err(ScrapeError::Aborted { completed, source }.into());
            }
            Err(e) => return Err(e).context("收集实体链接失败"),
        };

        self.save(&outcome)?;

        let stats = RunStats {
            success: outcome.dataset.len(),
            failed: outcome.failed.len(),
            total: outcome.dataset.len() + outcome.failed.len(),
            histories: outcome.histories.len(),
            cancelled: outcome.cancelled,
        };
        print_final_stats(&stats, &self.config.output_log_file);
        Ok(stats)
    }

    /// 保存数据集和历史记录；未配置任何输出格式时不写文件
    fn save(&self, outcome: &RunOutcome) -> Result<()> {
        if self.config.output_formats.is_empty() {
            info!("💡 未配置输出格式，跳过保存");
            return Ok(());
        }

        let dir = self.config.output_path();
        info!("\n📤 正在保存 {} 条记录到 {}", outcome.dataset.len(), dir.display());

        let report = Persister::new(self.config.output_formats.clone())
            .with_observer(self.observer.clone())
            .persist(&outcome.dataset, &dir, &self.config.base_name)
            .context("创建输出目录失败")?;
        if !report.is_complete() {
            warn!(
                "⚠️ {} 个格式保存失败，{} 个成功",
                report.failures.len(),
                report.written.len()
            );
        }

        save_histories(&dir, &outcome.histories);
        Ok(())
    }

    /// 关闭浏览器
    pub async fn shutdown(mut self) {
        if self.config.browser_debug_port.is_some() {
            // 连接的是外部浏览器，不负责关闭
            return;
        }
        if let Err(e) = self.browser.close().await {
            warn!("⚠️ 关闭浏览器失败: {}", e);
        }
    }
}

fn save_histories(dir: &Path, histories: &[HistoryRecord]) {
    for record in histories {
        match write_history(dir, record) {
            Ok(Some(path)) => info!("✓ 历史记录已保存: {}", path.display()),
            Ok(None) => {}
            Err(e) => error!("❌ 历史记录保存失败: {}", e),
        }
    }
}
