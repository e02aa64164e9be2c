use crate::error::ConfigError;
use crate::models::layout::PageLayout;
use std::path::Path;
use tokio::fs;

/// 从 TOML 文件加载页面布局
///
/// 文件中没有写出的部分使用内置默认布局
pub async fn load_layout(path: &Path) -> Result<PageLayout, ConfigError> {
    let path_str = path.display().to_string();

    let content = fs::read_to_string(path)
        .await
        .map_err(|source| ConfigError::LayoutRead {
            path: path_str.clone(),
            source,
        })?;

    let layout: PageLayout =
        toml::from_str(&content).map_err(|source| ConfigError::LayoutParse {
            path: path_str.clone(),
            source,
        })?;

    tracing::info!(
        "已加载页面布局: {} ({} 个字段, {} 个概览表)",
        path_str,
        layout.fields.len(),
        layout.overview_tables.len()
    );

    Ok(layout)
}

/// 加载布局：未指定文件时使用内置默认布局
pub async fn load_layout_or_default(path: Option<&str>) -> Result<PageLayout, ConfigError> {
    match path {
        Some(path) => load_layout(Path::new(path)).await,
        None => Ok(PageLayout::default()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::Locator;

    #[tokio::test]
    async fn test_load_layout_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("layout.toml");
        std::fs::write(
            &path,
            r##"
            overview_tables = [{ css = "table.overview" }]

            [[fields]]
            name = "symbol"
            locator = { css = ".symbol" }

            [index]
            table = { css = "#list" }
            "##,
        )
        .unwrap();

        let layout = load_layout(&path).await.unwrap();
        assert_eq!(layout.overview_tables, vec![Locator::css("table.overview")]);
        assert_eq!(layout.index.table, Locator::css("#list"));
        assert_eq!(layout.index.body, Locator::css("tbody"));
    }

    #[tokio::test]
    async fn test_missing_file_is_read_error() {
        let err = load_layout(Path::new("/definitely/not/here.toml"))
            .await
            .unwrap_err();
        assert!(matches!(err, ConfigError::LayoutRead { .. }));
    }

    #[tokio::test]
    async fn test_invalid_toml_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.toml");
        std::fs::write(&path, "fields = 42").unwrap();

        let err = load_layout(&path).await.unwrap_err();
        assert!(matches!(err, ConfigError::LayoutParse { .. }));
    }
}
