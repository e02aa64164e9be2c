//! 历史记录写入：每个实体一个 CSV

use std::fs;
use std::path::{Path, PathBuf};

use tracing::warn;

use crate::error::PersistError;
use crate::models::HistoryRecord;
use crate::services::persist::{write_atomic, OutputFormat};

/// 历史文件所在的子目录
pub const HISTORY_DIR: &str = "stock_history";

/// 标识字段值 → 安全的文件名
fn file_stem(symbol: &str) -> String {
    symbol
        .trim()
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// 写出 `{dir}/stock_history/{symbol}.csv`
///
/// # 返回
/// 实体没有标识值时不写文件，返回 None
pub fn write_history(dir: &Path, record: &HistoryRecord) -> Result<Option<PathBuf>, PersistError> {
    let Some(stem) = record
        .symbol
        .as_deref()
        .map(file_stem)
        .filter(|s| !s.is_empty())
    else {
        warn!("⚠️ 历史记录没有标识值，跳过写入");
        return Ok(None);
    };

    let history_dir = dir.join(HISTORY_DIR);
    fs::create_dir_all(&history_dir).map_err(|source| PersistError::CreateDir {
        path: history_dir.clone(),
        source,
    })?;

    let fail = |e: csv::Error| PersistError::render(OutputFormat::Csv, e);
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(&record.columns).map_err(fail)?;
    for row in &record.rows {
        writer.write_record(row).map_err(fail)?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| PersistError::render(OutputFormat::Csv, e.to_string()))?;

    let path = history_dir.join(format!("{}.csv", stem));
    write_atomic(&path, &bytes)?;
    Ok(Some(path))
}
