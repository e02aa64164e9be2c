/// 日志工具模块
///
/// 提供运行横幅和统计输出的辅助函数
use std::fs;

use anyhow::Result;
use tracing::info;

use crate::config::Config;

/// 运行统计
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunStats {
    pub success: usize,
    pub failed: usize,
    pub total: usize,
    pub histories: usize,
    pub cancelled: bool,
}

/// 初始化日志文件（写入文件头，覆盖旧内容）
///
/// # 参数
/// - `log_file_path`: 日志文件路径
pub fn init_log_file(log_file_path: &str) -> Result<()> {
    let log_header = format!(
        "{}\n抓取日志 - {}\n{}\n\n",
        "=".repeat(60),
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
        "=".repeat(60)
    );
    fs::write(log_file_path, log_header)?;
    Ok(())
}

/// 记录程序启动信息
pub fn log_startup(config: &Config) {
    info!("{}", "=".repeat(60));
    info!("🚀 程序启动 - 顺序抓取模式");
    info!("🌐 索引页: {}", config.index_url);
    match config.entity_limit() {
        Some(limit) => info!("📊 最多处理: {} 个实体", limit),
        None => info!("📊 最多处理: 不限制"),
    }
    info!("📁 输出目录: {}", config.output_dir);
    info!("📜 历史提取: {}", if config.history_enabled { "开启" } else { "关闭" });
    info!("{}", "=".repeat(60));
}

/// 打印最终统计信息
///
/// # 参数
/// - `stats`: 运行统计
/// - `log_file_path`: 日志文件路径
pub fn print_final_stats(stats: &RunStats, log_file_path: &str) {
    info!("\n{}", "=".repeat(60));
    info!("📊 全部处理完成统计");
    info!(
        "完成时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(60));
    info!("✅ 成功: {}/{}", stats.success, stats.total);
    info!("❌ 失败: {}", stats.failed);
    info!("📜 历史记录: {}", stats.histories);
    if stats.cancelled {
        info!("⏹️ 运行被中断，仅保存已完成的实体");
    }
    info!("{}", "=".repeat(60));
    info!("\n日志已保存至: {}", log_file_path);
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_init_log_file_writes_header() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("scrape.log");
        std::fs::write(&path, "old content").unwrap();

        init_log_file(path.to_str().unwrap()).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.starts_with(&"=".repeat(60)));
        assert!(content.contains("抓取日志"));
        assert!(!content.contains("old content"));
    }
}
