//! 浏览器获取：自行启动，或连接已运行的实例

pub mod connection;
pub mod headless;

use anyhow::Result;
use chromiumoxide::{Browser, Page};

use crate::config::Config;

pub use connection::connect_to_browser;
pub use headless::launch_browser;

/// 配置了调试端口时连接已有浏览器，否则启动新浏览器
pub async fn open_browser(config: &Config) -> Result<(Browser, Page)> {
    match config.browser_debug_port {
        Some(port) => connect_to_browser(port).await,
        None => launch_browser(config).await,
    }
}
