use std::path::PathBuf;
use std::time::Duration;

use crate::infrastructure::SettleStrategy;
use crate::services::OutputFormat;

/// 程序配置
#[derive(Clone, Debug)]
pub struct Config {
    /// 索引页 URL
    pub index_url: String,
    /// 最多处理的实体数（0 表示不限制）
    pub max_entities: usize,
    /// 输出目录
    pub output_dir: String,
    /// 输出文件基础名
    pub base_name: String,
    /// 是否提取历史数据
    pub history_enabled: bool,
    /// 输出格式（为空表示只返回数据、不写文件）
    pub output_formats: Vec<OutputFormat>,
    // --- 浏览器配置 ---
    pub headless: bool,
    /// 无痕模式
    pub private_session: bool,
    pub window_width: u32,
    pub window_height: u32,
    pub chrome_executable: Option<String>,
    /// 设置后连接已运行的浏览器，不再自行启动
    pub browser_debug_port: Option<u16>,
    // --- 页面就绪等待 ---
    pub ready_timeout_ms: u64,
    pub poll_interval_ms: u64,
    /// 设置后使用固定延时代替就绪轮询
    pub fixed_settle_ms: Option<u64>,
    /// 页面布局 TOML 文件（缺省使用内置布局）
    pub layout_file: Option<String>,
    /// 输出日志文件
    pub output_log_file: String,
    /// 是否显示详细日志
    pub verbose_logging: bool,
    /// 失败实体是否保存页面快照
    pub snapshot_failed_pages: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            index_url: "https://stockanalysis.com/list/sp-500-stocks/".to_string(),
            max_entities: 10,
            output_dir: "data".to_string(),
            base_name: "stock".to_string(),
            history_enabled: true,
            output_formats: OutputFormat::ALL.to_vec(),
            headless: true,
            private_session: true,
            window_width: 1920,
            window_height: 1080,
            chrome_executable: None,
            browser_debug_port: None,
            ready_timeout_ms: 10_000,
            poll_interval_ms: 250,
            fixed_settle_ms: None,
            layout_file: None,
            output_log_file: "scrape.log".to_string(),
            verbose_logging: false,
            snapshot_failed_pages: false,
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

fn env_string(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

impl Config {
    pub fn from_env() -> Self {
        let default = Self::default();
        Self {
            index_url: std::env::var("INDEX_URL").unwrap_or(default.index_url),
            max_entities: env_parse("MAX_ENTITIES").unwrap_or(default.max_entities),
            output_dir: std::env::var("OUTPUT_DIR").unwrap_or(default.output_dir),
            base_name: std::env::var("BASE_NAME").unwrap_or(default.base_name),
            history_enabled: env_parse("HISTORY_ENABLED").unwrap_or(default.history_enabled),
            output_formats: std::env::var("OUTPUT_FORMATS").ok().and_then(|v| OutputFormat::parse_list(&v).ok()).unwrap_or(default.output_formats),
            headless: env_parse("HEADLESS").unwrap_or(default.headless),
            private_session: env_parse("PRIVATE_SESSION").unwrap_or(default.private_session),
            window_width: env_parse("WINDOW_WIDTH").unwrap_or(default.window_width),
            window_height: env_parse("WINDOW_HEIGHT").unwrap_or(default.window_height),
            chrome_executable: env_string("CHROME_EXECUTABLE").or(default.chrome_executable),
            browser_debug_port: env_parse("BROWSER_DEBUG_PORT").or(default.browser_debug_port),
            ready_timeout_ms: env_parse("READY_TIMEOUT_MS").unwrap_or(default.ready_timeout_ms),
            poll_interval_ms: env_parse("POLL_INTERVAL_MS").unwrap_or(default.poll_interval_ms),
            fixed_settle_ms: env_parse("FIXED_SETTLE_MS").or(default.fixed_settle_ms),
            layout_file: env_string("LAYOUT_FILE").or(default.layout_file),
            output_log_file: std::env::var("OUTPUT_LOG_FILE").unwrap_or(default.output_log_file),
            verbose_logging: env_parse("VERBOSE_LOGGING").unwrap_or(default.verbose_logging),
            snapshot_failed_pages: env_parse("SNAPSHOT_FAILED_PAGES").unwrap_or(default.snapshot_failed_pages),
        }
    }

    /// 页面就绪等待策略
    pub fn settle_strategy(&self) -> SettleStrategy {
        match self.fixed_settle_ms {
            Some(ms) => SettleStrategy::Fixed(Duration::from_millis(ms)),
            None => SettleStrategy::Ready {
                timeout: Duration::from_millis(self.ready_timeout_ms),
                poll_interval: Duration::from_millis(self.poll_interval_ms.max(1)),
            },
        }
    }

    pub fn output_path(&self) -> PathBuf {
        PathBuf::from(&self.output_dir)
    }

    /// 链接截断上限（None 表示不截断）
    pub fn entity_limit(&self) -> Option<usize> {
        (self.max_entities > 0).then_some(self.max_entities)
    }
}
