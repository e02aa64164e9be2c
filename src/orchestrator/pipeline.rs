//! 抓取流水线 - 编排层
//!
//! ## 职责
//!
//! 1. **收集链接**：加载索引页，交给 `LinkCollector`
//! 2. **截断**：只保留前 K 个链接（调用方配置）
//! 3. **顺序处理**：逐个实体调用 `EntityFlow`，实体之间检查取消信号
//! 4. **失败隔离**：单个实体失败只记录，致命错误终止整个运行
//! 5. **组装数据集**：所有完成的实体记录合成一个 `Dataset`
//!
//! 访问器由调用方持有并借给流水线，流水线从不关闭它。

use std::path::PathBuf;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::{AppResult, ScrapeError};
use crate::infrastructure::{PageAccessor, SettleStrategy};
use crate::models::{Dataset, HistoryRecord, PageLayout};
use crate::services::persist::write_atomic;
use crate::services::{LinkCollector, ScrapeObserver};
use crate::workflow::{EntityCtx, EntityFlow, EntityStage};

/// 快照文件所在的子目录
pub const SNAPSHOT_DIR: &str = "snapshots";

/// 处理失败的实体
#[derive(Debug)]
pub struct FailedEntity {
    pub index: usize,
    pub url: String,
    pub stage: EntityStage,
    pub error: ScrapeError,
}

/// 一次运行的结果
#[derive(Debug, Default)]
pub struct RunOutcome {
    /// 所有成功实体的记录（失败实体不在其中）
    pub dataset: Dataset,
    /// 成功提取到的历史记录
    pub histories: Vec<HistoryRecord>,
    pub failed: Vec<FailedEntity>,
    /// 是否因取消信号提前结束
    pub cancelled: bool,
}

/// 抓取流水线
pub struct ScrapePipeline {
    index_url: String,
    layout: PageLayout,
    settle: SettleStrategy,
    limit: Option<usize>,
    history_enabled: bool,
    observer: Option<Arc<dyn ScrapeObserver>>,
    cancel: CancellationToken,
    snapshot_dir: Option<PathBuf>,
}

impl ScrapePipeline {
    pub fn new(index_url: impl Into<String>, layout: PageLayout, settle: SettleStrategy) -> Self {
        Self {
            index_url: index_url.into(),
            layout,
            settle,
            limit: None,
            history_enabled: true,
            observer: None,
            cancel: CancellationToken::new(),
            snapshot_dir: None,
        }
    }

    /// 只处理前 `limit` 个链接（None 表示全部）
    pub fn with_limit(mut self, limit: Option<usize>) -> Self {
        self.limit = limit;
        self
    }

    pub fn with_history(mut self, enabled: bool) -> Self {
        self.history_enabled = enabled;
        self
    }

    pub fn with_observer(mut self, observer: Arc<dyn ScrapeObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// 失败实体的页面源码写到 `{dir}/snapshots/{index}.html`
    pub fn with_snapshot_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.snapshot_dir = Some(dir.into());
        self
    }

    /// 收集链接
    ///
    /// # 返回
    /// 截断后的链接列表；索引表缺失或某行没有链接时返回结构错误
    pub async fn collect_links<A: PageAccessor>(&self, accessor: &A) -> AppResult<Vec<String>> {
        info!("📋 正在加载索引页: {}", self.index_url);
        accessor.load(&self.index_url).await?;
        if !self.settle.wait_for(accessor, &self.layout.index.table).await? {
            debug!("索引表就绪标志未出现，继续查找");
        }

        let mut links = LinkCollector::new(self.layout.index.clone())
            .collect(accessor)
            .await?;
        let total = links.len();
        if let Some(limit) = self.limit {
            links.truncate(limit);
        }

        if let Some(observer) = &self.observer {
            observer.on_links_collected(total, links.len());
        }
        Ok(links)
    }

    /// 运行整个流水线
    ///
    /// # 返回
    /// - `Ok(RunOutcome)`：正常结束或被取消
    /// - `Err(ScrapeError::Aborted)`：会话丢失或页面结构不符，附带已完成实体的 URL
    /// - 其他 `Err`：索引阶段失败
    pub async fn run<A: PageAccessor>(&self, accessor: &A) -> AppResult<RunOutcome> {
        let links = self.collect_links(accessor).await?;
        let flow = EntityFlow::new(self.layout.clone(), self.settle, self.history_enabled);

        let total = links.len();
        let mut outcome = RunOutcome::default();
        let mut records = Vec::with_capacity(total);
        let mut completed = Vec::with_capacity(total);

        for (i, url) in links.into_iter().enumerate() {
            if self.cancel.is_cancelled() {
                warn!("⏹️ 收到取消信号，已完成 {}/{} 个实体", i, total);
                outcome.cancelled = true;
                break;
            }

            let ctx = EntityCtx::new(url, i + 1, total);
            if let Some(observer) = &self.observer {
                observer.on_entity_started(&ctx);
            }

            match flow.run(accessor, &ctx).await {
                Ok(result) => {
                    if let Some(observer) = &self.observer {
                        observer.on_entity_completed(&ctx, &result.record);
                        if let Some(history) = &result.history {
                            observer.on_history(&ctx, history);
                        }
                    }
                    if let Some(history) = result.history.and_then(|h| h.into_record()) {
                        outcome.histories.push(history);
                    }
                    records.push(result.record);
                    completed.push(ctx.url);
                }
                Err(failure) => {
                    if let Some(observer) = &self.observer {
                        observer.on_entity_failed(&ctx, &failure.error);
                    }
                    if failure.error.is_run_fatal() {
                        return Err(ScrapeError::Aborted {
                            completed,
                            source: Box::new(failure.error),
                        });
                    }

                    self.snapshot(accessor, &ctx).await;
                    outcome.failed.push(FailedEntity {
                        index: ctx.index,
                        url: ctx.url,
                        stage: failure.stage,
                        error: failure.error,
                    });
                }
            }
        }

        outcome.dataset = Dataset::from_records(records);
        Ok(outcome)
    }

    /// 保存失败实体的当前页面，失败只记警告
    async fn snapshot<A: PageAccessor>(&self, accessor: &A, ctx: &EntityCtx) {
        let Some(dir) = &self.snapshot_dir else {
            return;
        };

        let html = match accessor.content().await {
            Ok(html) => html,
            Err(e) => {
                warn!("{} ⚠️ 无法获取页面快照: {}", ctx, e);
                return;
            }
        };

        let snapshot_dir = dir.join(SNAPSHOT_DIR);
        if let Err(e) = std::fs::create_dir_all(&snapshot_dir) {
            warn!("{} ⚠️ 创建快照目录失败: {}", ctx, e);
            return;
        }
        let path = snapshot_dir.join(format!("{}.html", ctx.index));
        match write_atomic(&path, html.as_bytes()) {
            Ok(()) => info!("{} 📄 页面快照已保存: {}", ctx, path.display()),
            Err(e) => warn!("{} ⚠️ 保存页面快照失败: {}", ctx, e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{AccessorError, AccessorResult};
    use crate::infrastructure::{Locator, StaticElement, StaticPageAccessor, StaticSite};
    use crate::models::{FieldSchema, FieldSpec, IndexLayout};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    const INDEX: &str = "https://stub.test/list/";

    fn layout() -> PageLayout {
        PageLayout {
            fields: FieldSchema::new(vec![FieldSpec {
                name: "symbol".into(),
                locator: Locator::css("#symbol"),
            }]),
            overview_tables: vec![Locator::css("#overview")],
            ready_marker: None,
            index: IndexLayout::default(),
            history: None,
            ..PageLayout::default()
        }
    }

    fn pipeline() -> ScrapePipeline {
        ScrapePipeline::new(INDEX, layout(), SettleStrategy::Fixed(Duration::ZERO))
    }

    fn index_page(paths: &[&str]) -> String {
        let rows: String = paths
            .iter()
            .map(|p| format!(r#"<tr><td><a href="{}">x</a></td></tr>"#, p))
            .collect();
        format!(r#"<table id="main-table"><tbody>{}</tbody></table>"#, rows)
    }

    fn detail(symbol: &str) -> String {
        format!(
            r#"<span id="symbol">{}</span><table id="overview"><tr><td>Market Cap</td><td>1B</td></tr></table>"#,
            symbol
        )
    }

    #[tokio::test]
    async fn test_limit_truncates_links() {
        let site = StaticSite::new().with_page(INDEX, &index_page(&["/a/", "/b/", "/c/"]));
        let accessor = StaticPageAccessor::new(site);

        let links = pipeline()
            .with_limit(Some(2))
            .collect_links(&accessor)
            .await
            .unwrap();
        assert_eq!(
            links,
            vec!["https://stub.test/a/", "https://stub.test/b/"]
        );
    }

    #[tokio::test]
    async fn test_failed_entity_is_excluded_and_run_continues() {
        let site = StaticSite::new()
            .with_page(INDEX, &index_page(&["/a/", "/missing/", "/c/"]))
            .with_page("https://stub.test/a/", &detail("A"))
            .with_page("https://stub.test/c/", &detail("C"));
        let accessor = StaticPageAccessor::new(site);

        let outcome = pipeline().run(&accessor).await.unwrap();

        assert_eq!(outcome.dataset.len(), 2);
        assert_eq!(outcome.failed.len(), 1);
        assert_eq!(outcome.failed[0].index, 2);
        assert_eq!(outcome.failed[0].stage, EntityStage::Loading);
        assert!(!outcome.cancelled);
    }

    #[tokio::test]
    async fn test_structural_error_aborts_with_completed_list() {
        let site = StaticSite::new()
            .with_page(INDEX, &index_page(&["/a/", "/b/"]))
            .with_page("https://stub.test/a/", &detail("A"))
            .with_page(
                "https://stub.test/b/",
                r#"<table id="overview"><tr><td>broken</td></tr></table>"#,
            );
        let accessor = StaticPageAccessor::new(site);

        match pipeline().run(&accessor).await {
            Err(ScrapeError::Aborted { completed, .. }) => {
                assert_eq!(completed, vec!["https://stub.test/a/"]);
            }
            other => panic!("expected abort, got {:?}", other),
        }
    }

    /// 第 `die_at` 次加载时浏览器会话断开
    struct FlakySession {
        inner: StaticPageAccessor,
        loads: AtomicUsize,
        die_at: usize,
    }

    impl PageAccessor for FlakySession {
        type Element = StaticElement;

        async fn load(&self, url: &str) -> AccessorResult<()> {
            if self.loads.fetch_add(1, Ordering::SeqCst) + 1 >= self.die_at {
                return Err(AccessorError::SessionLost {
                    source: "连接已断开".into(),
                });
            }
            self.inner.load(url).await
        }

        async fn find(&self, locator: &Locator) -> AccessorResult<Option<StaticElement>> {
            self.inner.find(locator).await
        }

        async fn find_all(&self, locator: &Locator) -> AccessorResult<Vec<StaticElement>> {
            self.inner.find_all(locator).await
        }

        async fn find_in(
            &self,
            parent: &StaticElement,
            locator: &Locator,
        ) -> AccessorResult<Option<StaticElement>> {
            self.inner.find_in(parent, locator).await
        }

        async fn find_all_in(
            &self,
            parent: &StaticElement,
            locator: &Locator,
        ) -> AccessorResult<Vec<StaticElement>> {
            self.inner.find_all_in(parent, locator).await
        }

        async fn text(&self, element: &StaticElement) -> AccessorResult<String> {
            self.inner.text(element).await
        }

        async fn attribute(
            &self,
            element: &StaticElement,
            name: &str,
        ) -> AccessorResult<Option<String>> {
            self.inner.attribute(element, name).await
        }

        async fn click(&self, element: &StaticElement) -> AccessorResult<()> {
            self.inner.click(element).await
        }

        async fn content(&self) -> AccessorResult<String> {
            self.inner.content().await
        }

        async fn current_url(&self) -> AccessorResult<Option<String>> {
            self.inner.current_url().await
        }
    }

    #[tokio::test]
    async fn test_lost_session_aborts_with_completed_list() {
        let site = StaticSite::new()
            .with_page(INDEX, &index_page(&["/a/", "/b/", "/c/"]))
            .with_page("https://stub.test/a/", &detail("A"))
            .with_page("https://stub.test/b/", &detail("B"))
            .with_page("https://stub.test/c/", &detail("C"));
        // 索引页、a 正常，加载 b 时断开
        let accessor = FlakySession {
            inner: StaticPageAccessor::new(site),
            loads: AtomicUsize::new(0),
            die_at: 3,
        };

        match pipeline().run(&accessor).await {
            Err(ScrapeError::Aborted { completed, source }) => {
                assert_eq!(completed, vec!["https://stub.test/a/"]);
                assert!(matches!(*source, ScrapeError::Accessor(ref e) if e.is_fatal()));
            }
            other => panic!("expected abort, got {:?}", other),
        }
        assert_eq!(accessor.loads.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_cancelled_before_start_keeps_empty_dataset() {
        let site = StaticSite::new()
            .with_page(INDEX, &index_page(&["/a/"]))
            .with_page("https://stub.test/a/", &detail("A"));
        let accessor = StaticPageAccessor::new(site);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let outcome = pipeline()
            .with_cancellation(cancel)
            .run(&accessor)
            .await
            .unwrap();

        assert!(outcome.cancelled);
        assert!(outcome.dataset.is_empty());
    }

    #[tokio::test]
    async fn test_missing_index_table_is_structural() {
        let site = StaticSite::new().with_page(INDEX, "<p>maintenance</p>");
        let accessor = StaticPageAccessor::new(site);

        let err = pipeline().run(&accessor).await.unwrap_err();
        assert!(matches!(err, ScrapeError::Structure(_)));
    }

    #[tokio::test]
    async fn test_snapshot_written_for_failed_entity() {
        let dir = tempfile::TempDir::new().unwrap();
        let site = StaticSite::new().with_page(INDEX, &index_page(&["/gone/"]));
        let accessor = StaticPageAccessor::new(site);

        let outcome = pipeline()
            .with_snapshot_dir(dir.path())
            .run(&accessor)
            .await
            .unwrap();

        assert_eq!(outcome.failed.len(), 1);
        // 加载失败时当前文档仍是索引页
        let snapshot = dir.path().join(SNAPSHOT_DIR).join("1.html");
        assert!(std::fs::read_to_string(snapshot).unwrap().contains("main-table"));
    }
}
