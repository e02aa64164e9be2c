//! 键值表解析服务 - 业务能力层
//!
//! 把两列的概览表解析成规范化的字段名 → 值

use indexmap::IndexMap;
use tracing::debug;

use crate::error::{AppResult, StructuralError};
use crate::infrastructure::{Locator, PageAccessor};

/// 把表格首列文字规范化为字段名
///
/// 去掉 `(` `)` `'`，裁剪，小写，空白与连字符替换为下划线。
/// 对已规范化的字段名是幂等的。
pub fn normalize_key(raw: &str) -> String {
    let stripped: String = raw.chars().filter(|c| !matches!(c, '(' | ')' | '\'')).collect();
    stripped
        .trim()
        .to_lowercase()
        .chars()
        .map(|c| if c.is_whitespace() || c == '-' { '_' } else { c })
        .collect()
}

/// 历史表列名：在 `normalize_key` 基础上再去掉句点
pub fn normalize_column(raw: &str) -> String {
    normalize_key(&raw.replace('.', ""))
}

/// 键值表解析服务
///
/// 职责：
/// - 按文档顺序遍历每张表的每一行
/// - 每行取前两个单元格：键、值
/// - 单元格不足两个说明页面结构已变，直接报错
#[derive(Debug, Clone)]
pub struct KeyValueTableParser {
    row: Locator,
    cell: Locator,
}

impl Default for KeyValueTableParser {
    fn default() -> Self {
        Self {
            row: Locator::css("tr"),
            cell: Locator::css("td"),
        }
    }
}

impl KeyValueTableParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// 解析已定位的表格
    ///
    /// # 返回
    /// 插入顺序为（表顺序，行顺序）；同名键后写覆盖
    pub async fn parse<A: PageAccessor>(
        &self,
        accessor: &A,
        tables: &[A::Element],
    ) -> AppResult<IndexMap<String, String>> {
        let mut pairs = IndexMap::new();

        for (table_index, table) in tables.iter().enumerate() {
            let rows = accessor.find_all_in(table, &self.row).await?;
            for (row_index, row) in rows.iter().enumerate() {
                let cells = accessor.find_all_in(row, &self.cell).await?;
                if cells.len() < 2 {
                    return Err(StructuralError::RowShape {
                        table: table_index + 1,
                        row: row_index + 1,
                        cells: cells.len(),
                    }
                    .into());
                }
                let key = normalize_key(&accessor.text(&cells[0]).await?);
                let value = accessor.text(&cells[1]).await?.trim().to_string();
                pairs.insert(key, value);
            }
        }

        debug!("概览表解析完成: {} 张表, {} 个键", tables.len(), pairs.len());
        Ok(pairs)
    }

    /// 先按定位器找到表格再解析；缺表视为页面结构错误
    pub async fn parse_located<A: PageAccessor>(
        &self,
        accessor: &A,
        locators: &[Locator],
    ) -> AppResult<IndexMap<String, String>> {
        let mut tables = Vec::with_capacity(locators.len());
        for locator in locators {
            let table = accessor
                .find(locator)
                .await?
                .ok_or_else(|| StructuralError::MissingContainer {
                    what: "概览表",
                    locator: locator.clone(),
                })?;
            tables.push(table);
        }
        self.parse(accessor, &tables).await
    }
}
