//! 链接收集服务 - 业务能力层
//!
//! 从索引页的数据表中按行取出详情页链接

use tracing::{debug, info};
use url::Url;

use crate::error::{AppResult, StructuralError};
use crate::infrastructure::PageAccessor;
use crate::models::IndexLayout;

/// 链接收集服务
///
/// 职责：
/// - 定位数据表 → 表体 → 行
/// - 每行取第一个链接的目标地址，按行顺序返回
/// - 任何一行缺少链接都直接报错，不会静默跳过
#[derive(Debug, Clone)]
pub struct LinkCollector {
    layout: IndexLayout,
}

impl LinkCollector {
    pub fn new(layout: IndexLayout) -> Self {
        Self { layout }
    }

    /// 收集当前文档中的详情页链接
    ///
    /// 相对地址按当前文档 URL 解析为绝对地址
    pub async fn collect<A: PageAccessor>(&self, accessor: &A) -> AppResult<Vec<String>> {
        let table = accessor
            .find(&self.layout.table)
            .await?
            .ok_or_else(|| StructuralError::MissingContainer {
                what: "索引表",
                locator: self.layout.table.clone(),
            })?;

        let body = accessor
            .find_in(&table, &self.layout.body)
            .await?
            .ok_or_else(|| StructuralError::MissingContainer {
                what: "索引表体",
                locator: self.layout.body.clone(),
            })?;

        let base = accessor
            .current_url()
            .await?
            .and_then(|u| Url::parse(&u).ok());

        let rows = accessor.find_all_in(&body, &self.layout.row).await?;
        let mut links = Vec::with_capacity(rows.len());

        for (index, row) in rows.iter().enumerate() {
            let missing = || StructuralError::MissingLink { row: index + 1 };

            let anchor = accessor
                .find_in(row, &self.layout.link)
                .await?
                .ok_or_else(missing)?;
            let href = accessor
                .attribute(&anchor, &self.layout.link_attribute)
                .await?
                .map(|h| h.trim().to_string())
                .filter(|h| !h.is_empty())
                .ok_or_else(missing)?;

            let resolved = match &base {
                Some(base) => base.join(&href).map(|u| u.to_string()).unwrap_or(href),
                None => href,
            };
            debug!("第 {} 行链接: {}", index + 1, resolved);
            links.push(resolved);
        }

        info!("✓ 从索引页获取到 {} 个链接", links.len());
        Ok(links)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ScrapeError;
    use crate::infrastructure::{StaticPageAccessor, StaticSite};

    const INDEX: &str = "https://stub.test/list/";

    async fn accessor(html: &str) -> StaticPageAccessor {
        let accessor = StaticPageAccessor::new(StaticSite::new().with_page(INDEX, html));
        accessor.load(INDEX).await.unwrap();
        accessor
    }

    #[tokio::test]
    async fn test_one_link_per_row_in_order() {
        let accessor = accessor(
            r#"<table id="main-table"><thead><tr><th>Symbol</th></tr></thead><tbody>
                <tr><td><a href="/stocks/aapl/">AAPL</a></td><td><a href="/other">x</a></td></tr>
                <tr><td><a href="https://elsewhere.test/msft/">MSFT</a></td></tr>
                <tr><td><a href="../stocks/goog/">GOOG</a></td></tr>
            </tbody></table>"#,
        )
        .await;

        let links = LinkCollector::new(IndexLayout::default())
            .collect(&accessor)
            .await
            .unwrap();
        assert_eq!(
            links,
            vec![
                "https://stub.test/stocks/aapl/",
                "https://elsewhere.test/msft/",
                "https://stub.test/stocks/goog/",
            ]
        );
    }

    #[tokio::test]
    async fn test_row_without_link_fails() {
        let accessor = accessor(
            r#"<table id="main-table"><tbody>
                <tr><td><a href="/stocks/aapl/">AAPL</a></td></tr>
                <tr><td>no link</td></tr>
                <tr><td><a href="/stocks/goog/">GOOG</a></td></tr>
            </tbody></table>"#,
        )
        .await;

        let err = LinkCollector::new(IndexLayout::default())
            .collect(&accessor)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ScrapeError::Structure(StructuralError::MissingLink { row: 2 })
        ));
    }

    #[tokio::test]
    async fn test_missing_table_fails() {
        let accessor = accessor("<table id=\"other\"></table>").await;
        let err = LinkCollector::new(IndexLayout::default())
            .collect(&accessor)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ScrapeError::Structure(StructuralError::MissingContainer { what: "索引表", .. })
        ));
    }
}
