//! Chromium 页面访问器 - 基础设施层
//!
//! 持有唯一的 Page 资源，把 CDP 能力翻译成 `PageAccessor`

use chromiumoxide::error::CdpError;
use chromiumoxide::{Element, Page};
use tracing::debug;

use crate::error::{AccessorError, AccessorResult};
use crate::infrastructure::page_accessor::{Locator, PageAccessor};

/// Chromium 页面访问器
///
/// 职责：
/// - 持有唯一的 Page 资源
/// - 查询不到元素时返回空结果而不是错误
/// - 区分会话失效（致命）与单次导航失败
pub struct ChromiumAccessor {
    page: Page,
}

impl ChromiumAccessor {
    /// 创建新的访问器
    pub fn new(page: Page) -> Self {
        Self { page }
    }

    /// 获取 page 的引用（用于其他操作）
    pub fn page(&self) -> &Page {
        &self.page
    }

    /// 查询失败时的统一处理：`NotFound` 视为无匹配
    fn query_result(
        locator: &Locator,
        result: Result<Vec<Element>, CdpError>,
    ) -> AccessorResult<Vec<Element>> {
        match result {
            Ok(elements) => Ok(elements),
            Err(CdpError::NotFound) => Ok(Vec::new()),
            Err(e) => Err(classify(e, |e| AccessorError::query(locator, e))),
        }
    }
}

/// 传输层错误意味着会话已失效，其余交给调用方归类
fn classify(err: CdpError, other: impl FnOnce(CdpError) -> AccessorError) -> AccessorError {
    if matches!(
        err,
        CdpError::Ws(_) | CdpError::ChannelSendError(_) | CdpError::NoResponse
    ) {
        AccessorError::SessionLost {
            source: Box::new(err),
        }
    } else {
        other(err)
    }
}

impl PageAccessor for ChromiumAccessor {
    type Element = Element;

    async fn load(&self, url: &str) -> AccessorResult<()> {
        debug!("导航到: {}", url);
        self.page
            .goto(url)
            .await
            .map_err(|e| classify(e, |e| AccessorError::navigation(url, e)))?;
        Ok(())
    }

    async fn find(&self, locator: &Locator) -> AccessorResult<Option<Element>> {
        Ok(self.find_all(locator).await?.into_iter().next())
    }

    async fn find_all(&self, locator: &Locator) -> AccessorResult<Vec<Element>> {
        let result = match locator {
            Locator::Xpath(xpath) => self.page.find_xpaths(xpath.as_str()).await,
            Locator::Css(css) => self.page.find_elements(css.as_str()).await,
        };
        Self::query_result(locator, result)
    }

    async fn find_in(&self, parent: &Element, locator: &Locator) -> AccessorResult<Option<Element>> {
        Ok(self.find_all_in(parent, locator).await?.into_iter().next())
    }

    async fn find_all_in(&self, parent: &Element, locator: &Locator) -> AccessorResult<Vec<Element>> {
        match locator {
            Locator::Css(css) => {
                let result = parent.find_elements(css.as_str()).await;
                Self::query_result(locator, result)
            }
            // CDP 的 XPath 搜索只作用于整个文档
            Locator::Xpath(_) => Err(AccessorError::UnsupportedLocator {
                locator: locator.clone(),
            }),
        }
    }

    async fn text(&self, element: &Element) -> AccessorResult<String> {
        let text = element
            .inner_text()
            .await
            .map_err(|e| classify(e, |e| AccessorError::operation("读取元素文本", e)))?;
        Ok(text.unwrap_or_default())
    }

    async fn attribute(&self, element: &Element, name: &str) -> AccessorResult<Option<String>> {
        element.attribute(name).await.map_err(|e| {
            classify(e, |e| {
                AccessorError::query(&Locator::css(format!("[{}]", name)), e)
            })
        })
    }

    async fn click(&self, element: &Element) -> AccessorResult<()> {
        element
            .click()
            .await
            .map_err(|e| classify(e, |e| AccessorError::operation("点击元素", e)))?;
        Ok(())
    }

    async fn content(&self) -> AccessorResult<String> {
        self.page
            .content()
            .await
            .map_err(|e| classify(e, |e| AccessorError::operation("读取页面内容", e)))
    }

    async fn current_url(&self) -> AccessorResult<Option<String>> {
        self.page
            .url()
            .await
            .map_err(|e| classify(e, |e| AccessorError::operation("读取当前 URL", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_errors_mean_session_lost() {
        let err = classify(CdpError::NoResponse, |e| AccessorError::operation("点击元素", e));
        assert!(matches!(err, AccessorError::SessionLost { .. }));
        assert!(err.is_fatal());
    }

    #[test]
    fn test_other_errors_use_fallback() {
        let err = classify(CdpError::NotFound, |e| AccessorError::operation("点击元素", e));
        assert!(matches!(err, AccessorError::Operation { action: "点击元素", .. }));
        assert!(!err.is_fatal());
        assert!(err.to_string().starts_with("点击元素失败"));
    }
}
