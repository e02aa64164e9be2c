//! 实体处理流程 - 流程层
//!
//! 核心职责：定义"一个实体"的完整处理流程
//!
//! 流程顺序（固定，不可交换）：
//! 1. 加载详情页
//! 2. 提取标量字段
//! 3. 解析概览表
//! 4. 提取历史（可选，会导航离开当前文档，所以必须最后做）

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use crate::error::ScrapeError;
use crate::infrastructure::{PageAccessor, SettleStrategy};
use crate::models::{EntityRecord, PageLayout};
use crate::services::{FieldExtractor, HistoryNavigator, HistoryOutcome, KeyValueTableParser};
use crate::workflow::entity_ctx::EntityCtx;

/// 单个实体所处的阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityStage {
    Loading,
    ExtractingFields,
    ParsingOverview,
    ExtractingHistory,
    Complete,
}

impl fmt::Display for EntityStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EntityStage::Loading => "加载页面",
            EntityStage::ExtractingFields => "提取字段",
            EntityStage::ParsingOverview => "解析概览表",
            EntityStage::ExtractingHistory => "提取历史",
            EntityStage::Complete => "完成",
        };
        f.write_str(name)
    }
}

/// 实体处理失败：出错的阶段 + 原因
#[derive(Debug)]
pub struct EntityFailure {
    pub stage: EntityStage,
    pub error: ScrapeError,
}

impl fmt::Display for EntityFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}阶段失败: {}", self.stage, self.error)
    }
}

/// 实体处理结果
#[derive(Debug)]
pub struct EntityResult {
    pub record: EntityRecord,
    /// 未启用历史提取时为 None
    pub history: Option<HistoryOutcome>,
}

static PARENTHETICAL: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"\s*\(.*?\)").ok());

/// 去掉名称中第一个括号及其内容（如交易所标注）
pub fn strip_parenthetical(name: &str) -> String {
    match PARENTHETICAL.as_ref() {
        Some(re) => re.replacen(name, 1, "").trim().to_string(),
        None => name.trim().to_string(),
    }
}

/// 实体处理流程
///
/// - 编排一个实体的完整处理流程
/// - 不持有任何资源（page），只借用访问器
/// - 不重试：缺失字段记为 None，加载失败即整个实体失败
pub struct EntityFlow {
    layout: PageLayout,
    settle: SettleStrategy,
    extractor: FieldExtractor,
    overview_parser: KeyValueTableParser,
    history: Option<HistoryNavigator>,
}

impl EntityFlow {
    /// 创建新的实体处理流程
    pub fn new(layout: PageLayout, settle: SettleStrategy, history_enabled: bool) -> Self {
        let history = layout
            .history
            .clone()
            .filter(|_| history_enabled)
            .map(|h| HistoryNavigator::new(h, settle));

        Self {
            layout,
            settle,
            extractor: FieldExtractor::new(),
            overview_parser: KeyValueTableParser::new(),
            history,
        }
    }

    pub fn layout(&self) -> &PageLayout {
        &self.layout
    }

    pub async fn run<A: PageAccessor>(
        &self,
        accessor: &A,
        ctx: &EntityCtx,
    ) -> Result<EntityResult, EntityFailure> {
        let mut stage = EntityStage::Loading;
        match self.run_stages(accessor, ctx, &mut stage).await {
            Ok(result) => Ok(result),
            Err(error) => Err(EntityFailure { stage, error }),
        }
    }

    async fn run_stages<A: PageAccessor>(
        &self,
        accessor: &A,
        ctx: &EntityCtx,
        stage: &mut EntityStage,
    ) -> Result<EntityResult, ScrapeError> {
        // ========== 1. 加载 ==========
        accessor.load(&ctx.url).await?;
        if let Some(marker) = &self.layout.ready_marker {
            if !self.settle.wait_for(accessor, marker).await? {
                debug!("{} 页面就绪标志未出现，继续提取", ctx);
            }
        }

        // ========== 2. 标量字段 ==========
        *stage = EntityStage::ExtractingFields;
        let fields = self
            .extractor
            .extract_schema(accessor, &self.layout.fields)
            .await?;

        // ========== 3. 概览表 ==========
        *stage = EntityStage::ParsingOverview;
        let overview = self
            .overview_parser
            .parse_located(accessor, &self.layout.overview_tables)
            .await?;

        // 合并顺序：标量字段在前，概览表在后，同名后写覆盖
        let mut record = EntityRecord::new(ctx.url.clone());
        for (name, value) in fields {
            let value = if name == self.layout.name_field {
                value.map(|v| strip_parenthetical(&v))
            } else {
                value
            };
            record.set(name, value);
        }
        for (key, value) in overview {
            record.set(key, Some(value));
        }
        debug!("{} 记录共 {} 个字段", ctx, record.len());

        // ========== 4. 历史（可选） ==========
        let history = match &self.history {
            Some(navigator) => {
                *stage = EntityStage::ExtractingHistory;
                let symbol = record.get(&self.layout.identity_field);
                Some(navigator.fetch(accessor, symbol).await?)
            }
            None => None,
        };

        *stage = EntityStage::Complete;
        Ok(EntityResult { record, history })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::{Locator, StaticPageAccessor, StaticSite};
    use crate::models::{FieldSchema, FieldSpec};

    const URL: &str = "https://stub.test/stocks/aapl/";

    fn layout() -> PageLayout {
        PageLayout {
            fields: FieldSchema::new(vec![
                FieldSpec {
                    name: "a".into(),
                    locator: Locator::css(".a"),
                },
                FieldSpec {
                    name: "name".into(),
                    locator: Locator::css("h1"),
                },
            ]),
            overview_tables: vec![Locator::css("#overview")],
            ready_marker: Some(Locator::css("h1")),
            history: None,
            ..PageLayout::default()
        }
    }

    fn flow() -> EntityFlow {
        EntityFlow::new(layout(), SettleStrategy::Fixed(Default::default()), true)
    }

    #[test]
    fn test_strip_parenthetical() {
        assert_eq!(strip_parenthetical("Apple Inc. (NASDAQ: AAPL)"), "Apple Inc.");
        assert_eq!(strip_parenthetical("A (x) B (y)"), "A B (y)");
        assert_eq!(strip_parenthetical(" Plain "), "Plain");
        assert!(PARENTHETICAL.is_some());
    }

    #[tokio::test]
    async fn test_overview_overwrites_scalar_field() {
        let site = StaticSite::new().with_page(
            URL,
            r#"<h1>Apple Inc. (NASDAQ: AAPL)</h1><span class="a">1</span>
               <table id="overview"><tr><td>A</td><td>2</td></tr><tr><td>B</td><td>3</td></tr></table>"#,
        );
        let accessor = StaticPageAccessor::new(site);

        let result = flow()
            .run(&accessor, &EntityCtx::new(URL, 1, 1))
            .await
            .unwrap();

        assert_eq!(result.record.get("a"), Some("2"));
        assert_eq!(result.record.get("b"), Some("3"));
        assert_eq!(result.record.get("name"), Some("Apple Inc."));
        assert_eq!(
            result.record.field_names().collect::<Vec<_>>(),
            vec!["a", "name", "b"]
        );
        assert!(result.history.is_none());
    }

    #[tokio::test]
    async fn test_missing_field_is_absent() {
        let site = StaticSite::new().with_page(
            URL,
            r#"<h1>Apple</h1><table id="overview"><tr><td>B</td><td>3</td></tr></table>"#,
        );
        let accessor = StaticPageAccessor::new(site);

        let result = flow()
            .run(&accessor, &EntityCtx::new(URL, 1, 1))
            .await
            .unwrap();

        assert!(result.record.contains("a"));
        assert_eq!(result.record.get("a"), None);
    }

    #[tokio::test]
    async fn test_load_failure_reports_stage() {
        let accessor = StaticPageAccessor::new(StaticSite::new());
        let failure = flow()
            .run(&accessor, &EntityCtx::new(URL, 1, 1))
            .await
            .unwrap_err();

        assert_eq!(failure.stage, EntityStage::Loading);
        assert!(!failure.error.is_run_fatal());
    }

    #[tokio::test]
    async fn test_bad_overview_row_reports_stage() {
        let site = StaticSite::new().with_page(
            URL,
            r#"<h1>Apple</h1><table id="overview"><tr><td>lonely</td></tr></table>"#,
        );
        let accessor = StaticPageAccessor::new(site);
        let failure = flow()
            .run(&accessor, &EntityCtx::new(URL, 1, 1))
            .await
            .unwrap_err();

        assert_eq!(failure.stage, EntityStage::ParsingOverview);
        assert!(failure.error.is_run_fatal());
    }
}
