use std::path::Path;

use anyhow::Result;
use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::StreamExt;
use tokio::time::sleep;
use tracing::{debug, error, info};

use crate::config::Config;

/// 按配置启动浏览器并打开一个空白页
///
/// # 参数
/// - `config`: 提供无头/无痕/窗口尺寸/可执行文件路径
pub async fn launch_browser(config: &Config) -> Result<(Browser, Page)> {
    info!(
        "🚀 启动浏览器（无头: {}, 无痕: {}）...",
        config.headless, config.private_session
    );

    let mut builder = BrowserConfig::builder().window_size(config.window_width, config.window_height);
    builder = if config.headless {
        builder.new_headless_mode()
    } else {
        builder.with_head()
    };
    if config.private_session {
        builder = builder.arg("--incognito");
    }
    if let Some(path) = &config.chrome_executable {
        debug!("使用浏览器可执行文件: {}", path);
        builder = builder.chrome_executable(Path::new(path));
    }

    let browser_config = builder
        .args(vec![
            "--disable-gpu",           // 无头模式下禁用 GPU
            "--no-sandbox",            // 容器内无沙盒权限
            "--disable-dev-shm-usage", // 防止共享内存不足
        ])
        .build()
        .map_err(|e| {
            error!("配置浏览器失败: {}", e);
            anyhow::anyhow!("配置浏览器失败: {}", e)
        })?;

    let (browser, mut handler) = Browser::launch(browser_config).await.map_err(|e| {
        error!("启动浏览器失败: {}", e);
        anyhow::anyhow!("启动浏览器失败: {}", e)
    })?;
    debug!("浏览器启动成功");

    // 在后台处理浏览器事件
    tokio::spawn(async move {
        while let Some(h) = handler.next().await {
            if h.is_err() {
                break;
            }
        }
    });

    // 等待浏览器状态同步
    sleep(tokio::time::Duration::from_millis(300)).await;

    let page = browser.new_page("about:blank").await.map_err(|e| {
        error!("创建页面失败: {}", e);
        anyhow::anyhow!("创建页面失败: {}", e)
    })?;

    info!("✅ 浏览器已就绪");
    Ok((browser, page))
}
