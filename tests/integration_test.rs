use stock_scrape::browser::open_browser;
use stock_scrape::config::Config;
use stock_scrape::infrastructure::{ChromiumAccessor, PageAccessor};
use stock_scrape::models::PageLayout;
use stock_scrape::ScrapePipeline;

fn live_config() -> Config {
    Config {
        max_entities: 2,
        ..Config::from_env()
    }
}

#[tokio::test]
#[ignore] // 默认忽略，需要手动运行：cargo test -- --ignored
async fn test_browser_launch() {
    let config = live_config();

    let (_browser, page) = open_browser(&config).await.expect("启动浏览器失败");
    let accessor = ChromiumAccessor::new(page);

    accessor.load(&config.index_url).await.expect("加载索引页失败");
    let url = accessor.current_url().await.expect("读取当前 URL 失败");
    assert!(url.is_some(), "页面应该有 URL");
}

#[tokio::test]
#[ignore]
async fn test_live_scrape_two_entities() {
    let config = live_config();

    let (_browser, page) = open_browser(&config).await.expect("启动浏览器失败");
    let accessor = ChromiumAccessor::new(page);

    let outcome = ScrapePipeline::new(
        config.index_url.clone(),
        PageLayout::default(),
        config.settle_strategy(),
    )
    .with_limit(config.entity_limit())
    .run(&accessor)
    .await
    .expect("抓取失败");

    println!(
        "成功 {} 个，失败 {} 个，历史 {} 个",
        outcome.dataset.len(),
        outcome.failed.len(),
        outcome.histories.len()
    );
    assert_eq!(outcome.dataset.len() + outcome.failed.len(), 2);
    assert!(outcome
        .dataset
        .records()
        .iter()
        .all(|r| r.get("symbol").is_some()));
}
