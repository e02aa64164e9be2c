//! # Stock Scrape
//!
//! 一个基于布局描述的网页抓取与多格式导出工具
//!
//! ## 架构设计
//!
//! 本系统采用严格的四层架构：
//!
//! ### ① 基础设施层（Infrastructure）
//! - `infrastructure/` - 持有稀缺资源（Page），只暴露能力
//! - `PageAccessor` - 页面访问能力（加载、定位、取文本、点击、等待就绪）
//! - `ChromiumAccessor` / `StaticPageAccessor` - 浏览器实现 / 离线 HTML 实现
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 描述"我能做什么"，只处理当前页面
//! - `FieldExtractor` - 按定位器提取字段，缺失即 None
//! - `KeyValueTableParser` - 解析两列概览表
//! - `LinkCollector` - 从索引表收集详情页链接
//! - `HistoryNavigator` - 点击"History"标签并提取历史表
//! - `Persister` - 数据集写出 xlsx / csv / json / pkl / xml
//!
//! ### ③ 流程层（Workflow）
//! - `workflow/` - 定义"一个实体"的完整处理流程
//! - `EntityCtx` - 上下文封装（url + 序号）
//! - `EntityFlow` - 流程编排（加载 → 字段 → 概览表 → 历史）
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/pipeline` - 收集链接，逐个处理实体，组装数据集
//! - `orchestrator/app` - 管理浏览器资源、持久化和统计
//!
//! ## 模块结构

pub mod browser;
pub mod config;
pub mod error;
pub mod infrastructure;
pub mod logger;

pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use config::Config;
pub use error::{AppResult, ScrapeError};
pub use infrastructure::{ChromiumAccessor, Locator, PageAccessor, SettleStrategy};
pub use models::{Dataset, EntityRecord, HistoryRecord, PageLayout};
pub use orchestrator::{App, RunOutcome, ScrapePipeline};
pub use services::{OutputFormat, Persister, ScrapeObserver, TracingObserver};
pub use workflow::{EntityCtx, EntityFlow};
