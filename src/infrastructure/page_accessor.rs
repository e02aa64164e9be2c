//! 页面访问能力 - 基础设施层
//!
//! 抽象出管道需要的全部浏览器能力：加载、查询、读文本、点击、等待。
//! 上层只依赖这个 trait，不认识具体的浏览器实现。

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::{sleep, Instant};
use tracing::debug;

use crate::error::AccessorResult;

/// 定位器：指向渲染后文档中某个位置的稳定引用
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Locator {
    /// XPath 表达式
    Xpath(String),
    /// CSS 选择器
    Css(String),
}

impl Locator {
    pub fn xpath(expr: impl Into<String>) -> Self {
        Locator::Xpath(expr.into())
    }

    pub fn css(selector: impl Into<String>) -> Self {
        Locator::Css(selector.into())
    }

    /// 定位表达式本身
    pub fn expr(&self) -> &str {
        match self {
            Locator::Xpath(expr) | Locator::Css(expr) => expr,
        }
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Locator::Xpath(expr) => write!(f, "xpath:{}", expr),
            Locator::Css(expr) => write!(f, "css:{}", expr),
        }
    }
}

/// 页面访问器
///
/// 一个实例代表一个独占的浏览会话：同一时刻只有一个当前文档，
/// 每次导航都会使之前取得的元素句柄失效。
///
/// 约定：
/// - 查询不到元素返回 `None` / 空列表，绝不返回错误
/// - 会话不可用时返回 `is_fatal()` 为 true 的错误
#[allow(async_fn_in_trait)]
pub trait PageAccessor {
    /// 元素句柄，只在当前文档内有效
    type Element;

    /// 加载 URL 并使其成为当前文档
    async fn load(&self, url: &str) -> AccessorResult<()>;

    /// 在当前文档中查找第一个匹配的元素
    async fn find(&self, locator: &Locator) -> AccessorResult<Option<Self::Element>>;

    /// 在当前文档中查找所有匹配的元素（文档顺序）
    async fn find_all(&self, locator: &Locator) -> AccessorResult<Vec<Self::Element>>;

    /// 在父元素内查找第一个匹配的元素
    async fn find_in(
        &self,
        parent: &Self::Element,
        locator: &Locator,
    ) -> AccessorResult<Option<Self::Element>>;

    /// 在父元素内查找所有匹配的元素（文档顺序）
    async fn find_all_in(
        &self,
        parent: &Self::Element,
        locator: &Locator,
    ) -> AccessorResult<Vec<Self::Element>>;

    /// 元素的可见文本（未裁剪）
    async fn text(&self, element: &Self::Element) -> AccessorResult<String>;

    /// 元素属性
    async fn attribute(&self, element: &Self::Element, name: &str)
        -> AccessorResult<Option<String>>;

    /// 点击元素
    async fn click(&self, element: &Self::Element) -> AccessorResult<()>;

    /// 当前文档的序列化内容
    async fn content(&self) -> AccessorResult<String>;

    /// 当前文档的 URL
    async fn current_url(&self) -> AccessorResult<Option<String>>;

    /// 固定延时
    async fn settle(&self, duration: Duration) {
        sleep(duration).await;
    }
}

/// 等待文档稳定的策略
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettleStrategy {
    /// 轮询直到目标元素出现或超时
    Ready {
        timeout: Duration,
        poll_interval: Duration,
    },
    /// 固定延时（没有就绪信号时的兜底）
    Fixed(Duration),
}

impl Default for SettleStrategy {
    fn default() -> Self {
        SettleStrategy::Ready {
            timeout: Duration::from_secs(10),
            poll_interval: Duration::from_millis(250),
        }
    }
}

impl SettleStrategy {
    /// 按策略等待 `marker` 出现
    ///
    /// # 返回
    /// 元素是否已出现。超时不是错误，由调用方的后续查找决定结果。
    /// `Fixed` 策略等待结束后直接返回 true。
    pub async fn wait_for<A: PageAccessor>(
        &self,
        accessor: &A,
        marker: &Locator,
    ) -> AccessorResult<bool> {
        match *self {
            SettleStrategy::Fixed(delay) => {
                accessor.settle(delay).await;
                Ok(true)
            }
            SettleStrategy::Ready {
                timeout,
                poll_interval,
            } => {
                let deadline = deadline_after(timeout);
                loop {
                    if accessor.find(marker).await?.is_some() {
                        return Ok(true);
                    }
                    if Instant::now() >= deadline {
                        debug!("等待 {} 超时 ({:?})", marker, timeout);
                        return Ok(false);
                    }
                    accessor.settle(poll_interval).await;
                }
            }
        }
    }
}

/// 超时过大导致 `Instant` 溢出时使用的上限
const MAX_WAIT: Duration = Duration::from_secs(24 * 60 * 60);

fn deadline_after(timeout: Duration) -> Instant {
    let now = Instant::now();
    now.checked_add(timeout).unwrap_or_else(|| now + MAX_WAIT)
}
