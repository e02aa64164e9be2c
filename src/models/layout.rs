//! 页面布局配置
//!
//! 所有定位器都是配置数据：一次运行内不变，每个实体都按同一份布局探测。

use serde::{Deserialize, Serialize};

use crate::infrastructure::Locator;

const MAIN: &str = "/html/body/div/div[1]/div[2]/main";
const PROFILE: &str = "/html/body/div/div[1]/div[2]/main/div[3]/div[1]/div[1]/div";

/// 单个标量字段
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSpec {
    pub name: String,
    pub locator: Locator,
}

/// 字段名 → 定位器的有序映射
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldSchema(Vec<FieldSpec>);

impl FieldSchema {
    pub fn new(fields: Vec<FieldSpec>) -> Self {
        Self(fields)
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldSpec> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Default for FieldSchema {
    fn default() -> Self {
        let field = |name: &str, path: String| FieldSpec {
            name: name.to_string(),
            locator: Locator::Xpath(path),
        };
        Self(vec![
            field("symbol", format!("{}/div[6]/span[2]", PROFILE)),
            field("name", format!("{}/div[1]/div[1]/div[1]/h1", MAIN)),
            field("price", format!("{}/div[1]/div[2]/div[1]/div[1]", MAIN)),
            field("industry", format!("{}/div[1]/a", PROFILE)),
            field("sector", format!("{}/div[2]/a", PROFILE)),
            field("ipo_date", format!("{}/div[3]/span[2]", PROFILE)),
            field("stock_exchange", format!("{}/div[5]/span[2]", PROFILE)),
            field("employees", format!("{}/div[4]/a", PROFILE)),
            field("website", format!("{}/div[7]/a", PROFILE)),
        ])
    }
}

/// 索引页布局：数据表 → 表体 → 行 → 第一个链接
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexLayout {
    pub table: Locator,
    pub body: Locator,
    pub row: Locator,
    pub link: Locator,
    pub link_attribute: String,
}

impl Default for IndexLayout {
    fn default() -> Self {
        Self {
            table: Locator::css("#main-table"),
            body: Locator::css("tbody"),
            row: Locator::css("tr"),
            link: Locator::css("a"),
            link_attribute: "href".to_string(),
        }
    }
}

/// 历史子资源布局
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryLayout {
    /// 导航列表中的所有条目
    pub nav_items: Locator,
    /// 需要精确匹配的导航文字
    pub label: String,
    /// 表头行容器
    pub header: Locator,
    /// 表体容器
    pub body: Locator,
    pub header_cell: Locator,
    pub row: Locator,
    pub cell: Locator,
}

impl Default for HistoryLayout {
    fn default() -> Self {
        Self {
            nav_items: Locator::Xpath(format!("{}/div[1]/nav/ul/li", MAIN)),
            label: "History".to_string(),
            header: Locator::Xpath(format!("{}/div[2]/div/div[3]/table/thead/tr", MAIN)),
            body: Locator::Xpath(format!("{}/div[2]/div/div[3]/table/tbody", MAIN)),
            header_cell: Locator::css("th"),
            row: Locator::css("tr"),
            cell: Locator::css("td"),
        }
    }
}

/// 一次运行使用的完整页面布局
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PageLayout {
    pub fields: FieldSchema,
    /// 概览键值表，按文档顺序合并
    pub overview_tables: Vec<Locator>,
    /// 需要去掉括号后缀的字段
    pub name_field: String,
    /// 标识实体的字段（历史文件名）
    pub identity_field: String,
    /// 详情页加载完成的标志元素
    pub ready_marker: Option<Locator>,
    pub index: IndexLayout,
    pub history: Option<HistoryLayout>,
}

impl Default for PageLayout {
    fn default() -> Self {
        Self {
            fields: FieldSchema::default(),
            overview_tables: vec![
                Locator::Xpath(format!("{}/div[2]/div[2]/table[1]", MAIN)),
                Locator::Xpath(format!("{}/div[2]/div[2]/table[2]", MAIN)),
            ],
            name_field: "name".to_string(),
            identity_field: "symbol".to_string(),
            ready_marker: Some(Locator::Xpath(format!("{}/div[1]/div[1]/div[1]/h1", MAIN))),
            index: IndexLayout::default(),
            history: Some(HistoryLayout::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_schema_order() {
        let layout = PageLayout::default();
        let names: Vec<_> = layout.fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names[..3], ["symbol", "name", "price"]);
        assert_eq!(layout.overview_tables.len(), 2);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let layout: PageLayout = toml::from_str(
            r#"
            identity_field = "ticker"

            [[fields]]
            name = "ticker"
            locator = { css = ".ticker" }
            "#,
        )
        .unwrap();

        assert_eq!(layout.identity_field, "ticker");
        assert_eq!(layout.fields.len(), 1);
        assert_eq!(layout.index, IndexLayout::default());
        assert!(layout.history.is_some());
    }
}
