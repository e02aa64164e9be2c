//! 历史子资源导航服务 - 业务能力层
//!
//! 按文字匹配导航条目，点击后提取历史表

use tracing::{debug, warn};

use crate::error::{AppResult, ScrapeError, StructuralError};
use crate::infrastructure::{PageAccessor, SettleStrategy};
use crate::models::{HistoryLayout, HistoryRecord};
use crate::services::key_value_parser::normalize_column;

/// 历史提取结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HistoryOutcome {
    /// 成功提取
    Present(HistoryRecord),
    /// 页面上没有历史标签，不是错误
    NoTab,
    /// 找到了标签但提取失败，只影响本实体的历史
    Failed(String),
}

impl HistoryOutcome {
    pub fn into_record(self) -> Option<HistoryRecord> {
        match self {
            HistoryOutcome::Present(record) => Some(record),
            HistoryOutcome::NoTab | HistoryOutcome::Failed(_) => None,
        }
    }

    pub fn record(&self) -> Option<&HistoryRecord> {
        match self {
            HistoryOutcome::Present(record) => Some(record),
            HistoryOutcome::NoTab | HistoryOutcome::Failed(_) => None,
        }
    }
}

/// 历史子资源导航服务
///
/// 职责：
/// - 读取导航列表所有条目的文字，精确匹配目标标签
/// - 点击匹配条目，等待历史表出现
/// - 提取表头（规范化列名）和表体
pub struct HistoryNavigator {
    layout: HistoryLayout,
    settle: SettleStrategy,
}

impl HistoryNavigator {
    pub fn new(layout: HistoryLayout, settle: SettleStrategy) -> Self {
        Self { layout, settle }
    }

    /// 在当前文档上提取历史
    ///
    /// 只有会话级致命错误会返回 Err，其余失败都归入 `HistoryOutcome`
    pub async fn fetch<A: PageAccessor>(
        &self,
        accessor: &A,
        symbol: Option<&str>,
    ) -> AppResult<HistoryOutcome> {
        let items = accessor.find_all(&self.layout.nav_items).await?;

        let mut position = None;
        for (index, item) in items.iter().enumerate() {
            if accessor.text(item).await?.trim() == self.layout.label {
                position = Some(index);
                break;
            }
        }

        let Some(position) = position else {
            debug!("导航中没有 '{}' 标签", self.layout.label);
            return Ok(HistoryOutcome::NoTab);
        };

        match self.open_and_extract(accessor, &items[position], symbol).await {
            Ok(record) => Ok(HistoryOutcome::Present(record)),
            Err(ScrapeError::Accessor(e)) if e.is_fatal() => Err(e.into()),
            Err(e) => {
                warn!("⚠️ 历史表提取失败 ({}): {}", symbol.unwrap_or("?"), e);
                Ok(HistoryOutcome::Failed(e.to_string()))
            }
        }
    }

    async fn open_and_extract<A: PageAccessor>(
        &self,
        accessor: &A,
        tab: &A::Element,
        symbol: Option<&str>,
    ) -> AppResult<HistoryRecord> {
        // 直接点击已取得的句柄，不再按下标重新拼定位器
        accessor.click(tab).await?;
        if !self.settle.wait_for(accessor, &self.layout.header).await? {
            debug!("历史表头未在等待时间内出现");
        }

        let header = accessor
            .find(&self.layout.header)
            .await?
            .ok_or_else(|| StructuralError::MissingContainer {
                what: "历史表头",
                locator: self.layout.header.clone(),
            })?;
        let body = accessor
            .find(&self.layout.body)
            .await?
            .ok_or_else(|| StructuralError::MissingContainer {
                what: "历史表体",
                locator: self.layout.body.clone(),
            })?;

        let mut columns = Vec::new();
        for cell in accessor.find_all_in(&header, &self.layout.header_cell).await? {
            columns.push(normalize_column(&accessor.text(&cell).await?));
        }
        if columns.is_empty() {
            return Err(StructuralError::EmptyHeader {
                locator: self.layout.header.clone(),
            }
            .into());
        }

        let mut rows = Vec::new();
        for row in accessor.find_all_in(&body, &self.layout.row).await? {
            let mut cells = Vec::with_capacity(columns.len());
            for cell in accessor.find_all_in(&row, &self.layout.cell).await? {
                cells.push(accessor.text(&cell).await?.trim().to_string());
            }
            if cells.len() != columns.len() {
                debug!(
                    "历史表行宽 {} 与表头 {} 不一致，已对齐",
                    cells.len(),
                    columns.len()
                );
                cells.resize(columns.len(), String::new());
            }
            rows.push(cells);
        }

        Ok(HistoryRecord {
            symbol: symbol.map(str::to_string),
            columns,
            rows,
        })
    }
}
