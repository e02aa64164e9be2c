//! 日志初始化：控制台 + 日志文件两路输出

use std::path::Path;

use anyhow::Result;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;

/// 初始化全局日志
///
/// 过滤级别默认 `info`（`verbose_logging` 时为 `debug`），可被 `RUST_LOG` 覆盖。
/// 文件输出追加写入 `config.output_log_file`。
///
/// # 返回
/// 文件写入线程的 guard，必须持有到程序结束，否则尾部日志会丢失
pub fn init(config: &Config) -> Result<WorkerGuard> {
    let default_level = if config.verbose_logging { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let log_path = Path::new(&config.output_log_file);
    let dir = log_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let file_name = log_path
        .file_name()
        .ok_or_else(|| anyhow::anyhow!("日志文件路径无效: {}", config.output_log_file))?;

    let appender = tracing_appender::rolling::never(dir, file_name);
    let (file_writer, guard) = tracing_appender::non_blocking(appender);

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false))
        .with(fmt::layer().with_writer(file_writer).with_ansi(false))
        .try_init()
        .map_err(|e| anyhow::anyhow!("初始化日志失败: {}", e))?;

    Ok(guard)
}
