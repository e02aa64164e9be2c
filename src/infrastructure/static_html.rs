//! 静态 HTML 页面访问器
//!
//! 从内存中的 URL → HTML 映射提供页面，用 CSS 选择器查询。
//! 用于离线回放和测试，不支持 XPath。

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use scraper::{ElementRef, Html, Selector};
use tracing::debug;
use url::Url;

use crate::error::{AccessorError, AccessorResult};
use crate::infrastructure::page_accessor::{Locator, PageAccessor};

/// URL → HTML 的静态站点
#[derive(Debug, Clone, Default)]
pub struct StaticSite {
    pages: HashMap<String, String>,
}

impl StaticSite {
    pub fn new() -> Self {
        Self::default()
    }

    /// 添加页面
    pub fn with_page(mut self, url: impl Into<String>, html: impl Into<String>) -> Self {
        self.pages.insert(url.into(), html.into());
        self
    }

    pub fn insert(&mut self, url: impl Into<String>, html: impl Into<String>) {
        self.pages.insert(url.into(), html.into());
    }

    /// 查找页面，容忍结尾斜杠的差异
    fn get(&self, url: &str) -> Option<&String> {
        self.pages.get(url).or_else(|| {
            let alt = match url.strip_suffix('/') {
                Some(trimmed) => trimmed.to_string(),
                None => format!("{}/", url),
            };
            self.pages.get(&alt)
        })
    }
}

/// 静态文档中的元素句柄
///
/// `index` 是元素在文档中的先序位置，`generation` 标识所属文档；
/// 导航之后旧句柄失效。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StaticElement {
    index: usize,
    generation: u64,
}

#[derive(Debug)]
struct LoadedDocument {
    url: String,
    source: String,
    generation: u64,
}

/// 基于 scraper 的页面访问器
#[derive(Debug)]
pub struct StaticPageAccessor {
    site: StaticSite,
    current: Mutex<Option<LoadedDocument>>,
}

impl StaticPageAccessor {
    pub fn new(site: StaticSite) -> Self {
        Self {
            site,
            current: Mutex::new(None),
        }
    }

    /// 取出当前文档的快照（不跨 await 持锁）
    fn snapshot(&self) -> AccessorResult<(String, String, u64)> {
        let guard = self.current.lock().unwrap_or_else(|e| e.into_inner());
        let doc = guard.as_ref().ok_or(AccessorError::NoDocument)?;
        Ok((doc.url.clone(), doc.source.clone(), doc.generation))
    }

    fn selector(locator: &Locator) -> AccessorResult<Selector> {
        match locator {
            Locator::Css(css) => Selector::parse(css)
                .map_err(|e| AccessorError::query(locator, format!("无效的 CSS 选择器: {:?}", e))),
            Locator::Xpath(_) => Err(AccessorError::UnsupportedLocator {
                locator: locator.clone(),
            }),
        }
    }

    fn all_elements() -> AccessorResult<Selector> {
        Self::selector(&Locator::css("*"))
    }

    fn handle_of(all: &Selector, doc: &Html, element: &ElementRef<'_>, generation: u64) -> StaticElement {
        let index = doc
            .select(all)
            .position(|e| e.id() == element.id())
            .unwrap_or(usize::MAX);
        StaticElement { index, generation }
    }

    fn resolve<'a>(
        doc: &'a Html,
        handle: &StaticElement,
        generation: u64,
    ) -> AccessorResult<ElementRef<'a>> {
        if handle.generation != generation {
            return Err(AccessorError::StaleElement);
        }
        doc.select(&Self::all_elements()?)
            .nth(handle.index)
            .ok_or(AccessorError::StaleElement)
    }

    fn query(
        &self,
        parent: Option<&StaticElement>,
        locator: &Locator,
        first_only: bool,
    ) -> AccessorResult<Vec<StaticElement>> {
        let selector = Self::selector(locator)?;
        let (_, source, generation) = self.snapshot()?;
        let doc = Html::parse_document(&source);

        let found: Vec<ElementRef<'_>> = match parent {
            Some(handle) => {
                let parent = Self::resolve(&doc, handle, generation)?;
                let iter = parent.select(&selector);
                if first_only {
                    iter.take(1).collect()
                } else {
                    iter.collect()
                }
            }
            None => {
                let iter = doc.select(&selector);
                if first_only {
                    iter.take(1).collect()
                } else {
                    iter.collect()
                }
            }
        };

        let all = Self::all_elements()?;
        Ok(found
            .iter()
            .map(|e| Self::handle_of(&all, &doc, e, generation))
            .collect())
    }

    /// 点击目标：元素自身或其第一个带链接的后代
    fn click_target(element: &ElementRef<'_>) -> Option<String> {
        let own = element
            .value()
            .attr("data-href")
            .or_else(|| element.value().attr("href"));
        if let Some(target) = own {
            return Some(target.to_string());
        }
        let link = Selector::parse("[href], [data-href]").ok()?;
        element.select(&link).next().and_then(|e| {
            e.value()
                .attr("data-href")
                .or_else(|| e.value().attr("href"))
                .map(str::to_string)
        })
    }
}

impl PageAccessor for StaticPageAccessor {
    type Element = StaticElement;

    async fn load(&self, url: &str) -> AccessorResult<()> {
        let source = self
            .site
            .get(url)
            .ok_or_else(|| AccessorError::navigation(url, "页面不存在"))?
            .clone();

        let mut guard = self.current.lock().unwrap_or_else(|e| e.into_inner());
        let generation = guard.as_ref().map_or(0, |d| d.generation + 1);
        *guard = Some(LoadedDocument {
            url: url.to_string(),
            source,
            generation,
        });
        debug!("静态页面已加载: {}", url);
        Ok(())
    }

    async fn find(&self, locator: &Locator) -> AccessorResult<Option<StaticElement>> {
        Ok(self.query(None, locator, true)?.into_iter().next())
    }

    async fn find_all(&self, locator: &Locator) -> AccessorResult<Vec<StaticElement>> {
        self.query(None, locator, false)
    }

    async fn find_in(
        &self,
        parent: &StaticElement,
        locator: &Locator,
    ) -> AccessorResult<Option<StaticElement>> {
        Ok(self.query(Some(parent), locator, true)?.into_iter().next())
    }

    async fn find_all_in(
        &self,
        parent: &StaticElement,
        locator: &Locator,
    ) -> AccessorResult<Vec<StaticElement>> {
        self.query(Some(parent), locator, false)
    }

    async fn text(&self, element: &StaticElement) -> AccessorResult<String> {
        let (_, source, generation) = self.snapshot()?;
        let doc = Html::parse_document(&source);
        let element = Self::resolve(&doc, element, generation)?;
        let raw: String = element.text().collect();
        Ok(raw.split_whitespace().collect::<Vec<_>>().join(" "))
    }

    async fn attribute(
        &self,
        element: &StaticElement,
        name: &str,
    ) -> AccessorResult<Option<String>> {
        let (_, source, generation) = self.snapshot()?;
        let doc = Html::parse_document(&source);
        let element = Self::resolve(&doc, element, generation)?;
        Ok(element.value().attr(name).map(str::to_string))
    }

    async fn click(&self, element: &StaticElement) -> AccessorResult<()> {
        let target = {
            let (url, source, generation) = self.snapshot()?;
            let doc = Html::parse_document(&source);
            let element = Self::resolve(&doc, element, generation)?;
            Self::click_target(&element).map(|href| {
                Url::parse(&url)
                    .and_then(|base| base.join(&href))
                    .map(|u| u.to_string())
                    .unwrap_or(href)
            })
        };

        match target {
            Some(url) => self.load(&url).await,
            None => Ok(()),
        }
    }

    async fn content(&self) -> AccessorResult<String> {
        Ok(self.snapshot()?.1)
    }

    async fn current_url(&self) -> AccessorResult<Option<String>> {
        let guard = self.current.lock().unwrap_or_else(|e| e.into_inner());
        Ok(guard.as_ref().map(|d| d.url.clone()))
    }

    async fn settle(&self, _duration: Duration) {
        tokio::task::yield_now().await;
    }
}
