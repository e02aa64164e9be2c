//! 数据集持久化服务 - 业务能力层
//!
//! 把一次运行的数据集写成多种格式。每种格式独立渲染、独立写入，
//! 一种格式失败不影响其余格式。

pub mod history;
pub mod tabular;
pub mod xml;

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ConfigError, PersistError};
use crate::models::Dataset;
use crate::services::observer::ScrapeObserver;

pub use history::{write_history, HISTORY_DIR};

/// 输出格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Xlsx,
    Csv,
    Json,
    Pkl,
    Xml,
}

impl OutputFormat {
    /// 全部格式，按写入顺序
    pub const ALL: [OutputFormat; 5] = [
        OutputFormat::Xlsx,
        OutputFormat::Csv,
        OutputFormat::Json,
        OutputFormat::Pkl,
        OutputFormat::Xml,
    ];

    /// 文件扩展名
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Xlsx => "xlsx",
            OutputFormat::Csv => "csv",
            OutputFormat::Json => "json",
            OutputFormat::Pkl => "pkl",
            OutputFormat::Xml => "xml",
        }
    }

    /// 解析逗号分隔的格式列表，空串表示不保存
    pub fn parse_list(raw: &str) -> Result<Vec<OutputFormat>, ConfigError> {
        raw.split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::parse)
            .collect()
    }

    fn render(self, dataset: &Dataset) -> Result<Vec<u8>, PersistError> {
        match self {
            OutputFormat::Xlsx => tabular::render_xlsx(dataset),
            OutputFormat::Csv => tabular::render_csv(dataset),
            OutputFormat::Json => tabular::render_json(dataset),
            OutputFormat::Pkl => tabular::render_pickle(dataset),
            OutputFormat::Xml => xml::render_xml(dataset),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for OutputFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "xlsx" => Ok(OutputFormat::Xlsx),
            "csv" => Ok(OutputFormat::Csv),
            "json" => Ok(OutputFormat::Json),
            "pkl" | "pickle" => Ok(OutputFormat::Pkl),
            "xml" => Ok(OutputFormat::Xml),
            _ => Err(ConfigError::InvalidFormat(s.to_string())),
        }
    }
}

/// 持久化结果
#[derive(Debug, Default)]
pub struct PersistReport {
    /// 成功写入的文件
    pub written: Vec<PathBuf>,
    /// 失败的格式及原因
    pub failures: Vec<(OutputFormat, PersistError)>,
}

impl PersistReport {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// 数据集持久化服务
pub struct Persister {
    formats: Vec<OutputFormat>,
    observer: Option<Arc<dyn ScrapeObserver>>,
}

impl Persister {
    pub fn new(formats: Vec<OutputFormat>) -> Self {
        Self {
            formats,
            observer: None,
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn ScrapeObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// 写出 `{dir}/{base_name}.{ext}`
    ///
    /// # 返回
    /// 只有目录无法创建时返回 Err；单个格式的失败记录在报告里
    pub fn persist(
        &self,
        dataset: &Dataset,
        dir: &Path,
        base_name: &str,
    ) -> Result<PersistReport, PersistError> {
        fs::create_dir_all(dir).map_err(|source| PersistError::CreateDir {
            path: dir.to_path_buf(),
            source,
        })?;

        let mut report = PersistReport::default();
        for &format in &self.formats {
            let path = dir.join(format!("{}.{}", base_name, format.extension()));
            let result = format
                .render(dataset)
                .and_then(|bytes| write_atomic(&path, &bytes));

            match result {
                Ok(()) => {
                    if let Some(observer) = &self.observer {
                        observer.on_format_written(format, &path);
                    }
                    report.written.push(path);
                }
                Err(e) => {
                    if let Some(observer) = &self.observer {
                        observer.on_format_failed(format, &e);
                    }
                    report.failures.push((format, e));
                }
            }
        }

        Ok(report)
    }
}

impl Default for Persister {
    fn default() -> Self {
        Self::new(OutputFormat::ALL.to_vec())
    }
}

/// 原子写入：先写同目录下的临时文件，再重命名到目标路径
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), PersistError> {
    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    let temp_path = parent.join(format!(
        ".{}.tmp",
        path.file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("output")
    ));

    fs::write(&temp_path, bytes).map_err(|source| PersistError::Write {
        path: temp_path.clone(),
        source,
    })?;

    if let Err(source) = fs::rename(&temp_path, path) {
        let _ = fs::remove_file(&temp_path);
        return Err(PersistError::Write {
            path: path.to_path_buf(),
            source,
        });
    }

    debug!("已写入 {} ({} 字节)", path.display(), bytes.len());
    Ok(())
}
