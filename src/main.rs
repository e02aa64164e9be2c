use anyhow::Result;
use stock_scrape::utils::init_log_file;
use stock_scrape::{logger, App, Config};
use tokio_util::sync::CancellationToken;
use tracing::warn;

#[tokio::main]
async fn main() -> Result<()> {
    // 加载配置
    let config = Config::from_env();

    // 初始化日志（先写文件头，再挂上文件输出）
    init_log_file(&config.output_log_file)?;
    let _guard = logger::init(&config)?;

    // Ctrl-C 只在实体之间生效，当前实体会处理完
    let cancel = CancellationToken::new();
    let signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("⏹️ 收到 Ctrl-C，当前实体完成后停止");
            signal.cancel();
        }
    });

    // 初始化并运行应用
    let app = App::initialize(config).await?;
    let result = app.run(cancel).await;
    app.shutdown().await;

    result.map(|_| ())
}
