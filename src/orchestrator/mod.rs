//! 编排层（Orchestration Layer）
//!
//! ## 模块划分
//!
//! ### `app` - 应用
//! - 管理应用生命周期（初始化、运行、关闭浏览器）
//! - 持久化数据集和历史记录
//! - 输出全局统计信息
//!
//! ### `pipeline` - 抓取流水线
//! - 收集并截断链接
//! - 逐个实体调用 EntityFlow，检查取消信号
//! - 隔离实体级失败，致命错误终止运行
//!
//! ## 层次关系
//!
//! ```text
//! app (持有 Browser)
//!     ↓
//! pipeline (处理 Vec<链接>)
//!     ↓
//! workflow::EntityFlow (处理单个实体)
//!     ↓
//! services (能力层：字段 / 概览表 / 链接 / 历史 / 持久化)
//!     ↓
//! infrastructure (基础设施：PageAccessor)
//! ```

pub mod app;
pub mod pipeline;

pub use app::App;
pub use pipeline::{FailedEntity, RunOutcome, ScrapePipeline};
