use std::path::PathBuf;

use thiserror::Error;

use crate::infrastructure::Locator;
use crate::services::persist::OutputFormat;

/// 第三方库错误的统一装箱类型
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// 应用程序错误类型
#[derive(Debug, Error)]
pub enum ScrapeError {
    /// 页面访问错误
    #[error("页面访问错误: {0}")]
    Accessor(#[from] AccessorError),
    /// 页面结构与布局约定不符
    #[error("页面结构错误: {0}")]
    Structure(#[from] StructuralError),
    /// 持久化错误
    #[error("持久化错误: {0}")]
    Persist(#[from] PersistError),
    /// 配置错误
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),
    /// 运行被致命错误中止，`completed` 为中止前已完成的实体
    #[error("运行中止 (已完成 {} 个实体): {source}", completed.len())]
    Aborted {
        completed: Vec<String>,
        #[source]
        source: Box<ScrapeError>,
    },
}

impl ScrapeError {
    /// 该错误是否必须终止整个运行
    pub fn is_run_fatal(&self) -> bool {
        match self {
            ScrapeError::Accessor(e) => e.is_fatal(),
            ScrapeError::Structure(_) | ScrapeError::Aborted { .. } => true,
            ScrapeError::Persist(_) | ScrapeError::Config(_) => false,
        }
    }
}

/// 页面访问器错误
#[derive(Debug, Error)]
pub enum AccessorError {
    /// 导航失败（单个实体级别）
    #[error("导航到 {url} 失败: {source}")]
    Navigation {
        url: String,
        #[source]
        source: BoxError,
    },
    /// 浏览器会话已不可用
    #[error("浏览器会话已失效: {source}")]
    SessionLost {
        #[source]
        source: BoxError,
    },
    /// 尚未加载任何页面
    #[error("当前没有已加载的页面")]
    NoDocument,
    /// 元素句柄所属的文档已被导航替换
    #[error("元素句柄已失效（文档已导航）")]
    StaleElement,
    /// 访问器不支持该定位器
    #[error("不支持的定位器: {locator}")]
    UnsupportedLocator { locator: Locator },
    /// 查询失败（非缺失）
    #[error("查询 {locator} 失败: {source}")]
    Query {
        locator: Locator,
        #[source]
        source: BoxError,
    },
    /// 元素或页面级操作失败（不涉及定位器）
    #[error("{action}失败: {source}")]
    Operation {
        action: &'static str,
        #[source]
        source: BoxError,
    },
}

impl AccessorError {
    /// 会话本身不可用时为 true
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            AccessorError::SessionLost { .. } | AccessorError::NoDocument
        )
    }

    pub fn navigation(url: impl Into<String>, source: impl Into<BoxError>) -> Self {
        AccessorError::Navigation {
            url: url.into(),
            source: source.into(),
        }
    }

    pub fn query(locator: &Locator, source: impl Into<BoxError>) -> Self {
        AccessorError::Query {
            locator: locator.clone(),
            source: source.into(),
        }
    }

    pub fn operation(action: &'static str, source: impl Into<BoxError>) -> Self {
        AccessorError::Operation {
            action,
            source: source.into(),
        }
    }
}

/// 页面结构错误：页面布局已不再匹配配置
#[derive(Debug, Error)]
pub enum StructuralError {
    /// 找不到必需的容器
    #[error("找不到 {what} ({locator})")]
    MissingContainer { what: &'static str, locator: Locator },
    /// 键值表的行单元格数量不足
    #[error("概览表 {table} 第 {row} 行只有 {cells} 个单元格，至少需要 2 个")]
    RowShape {
        table: usize,
        row: usize,
        cells: usize,
    },
    /// 索引表的某一行没有链接
    #[error("索引表第 {row} 行没有链接")]
    MissingLink { row: usize },
    /// 表头为空
    #[error("表头为空 ({locator})")]
    EmptyHeader { locator: Locator },
}

/// 持久化错误
#[derive(Debug, Error)]
pub enum PersistError {
    /// 创建输出目录失败
    #[error("无法创建目录 {}: {source}", path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// 序列化失败
    #[error("{format} 序列化失败: {source}")]
    Render {
        format: OutputFormat,
        #[source]
        source: BoxError,
    },
    /// 写入文件失败
    #[error("写入文件失败 ({}): {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl PersistError {
    pub fn render(format: OutputFormat, source: impl Into<BoxError>) -> Self {
        PersistError::Render {
            format,
            source: source.into(),
        }
    }
}

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 读取布局文件失败
    #[error("无法读取布局文件 {path}: {source}")]
    LayoutRead {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// 布局文件解析失败
    #[error("布局文件解析失败 {path}: {source}")]
    LayoutParse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
    /// 未知的输出格式
    #[error("未知的输出格式: {0}")]
    InvalidFormat(String),
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type AppResult<T> = Result<T, ScrapeError>;

/// 页面访问结果类型
pub type AccessorResult<T> = Result<T, AccessorError>;
