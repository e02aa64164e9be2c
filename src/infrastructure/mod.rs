//! 基础设施层（Infrastructure）
//!
//! 持有稀缺资源（浏览器页面），只向上暴露 `PageAccessor` 能力。

pub mod chromium;
pub mod page_accessor;
pub mod static_html;

pub use chromium::ChromiumAccessor;
pub use page_accessor::{Locator, PageAccessor, SettleStrategy};
pub use static_html::{StaticElement, StaticPageAccessor, StaticSite};
