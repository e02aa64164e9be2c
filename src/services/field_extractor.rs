//! 字段提取服务 - 业务能力层
//!
//! 只负责"按定位器取一段文本"，缺失即 None

use tracing::debug;

use crate::error::AccessorResult;
use crate::infrastructure::{Locator, PageAccessor};
use crate::models::FieldSchema;

/// 字段提取服务
///
/// 职责：
/// - 查询当前文档，返回裁剪后的可见文本
/// - 找不到元素时返回 None，不打断实体处理
/// - 访问器本身的错误原样向上传递
#[derive(Debug, Default, Clone, Copy)]
pub struct FieldExtractor;

impl FieldExtractor {
    pub fn new() -> Self {
        Self
    }

    /// 提取单个字段
    pub async fn extract<A: PageAccessor>(
        &self,
        accessor: &A,
        locator: &Locator,
    ) -> AccessorResult<Option<String>> {
        match accessor.find(locator).await? {
            Some(element) => Ok(Some(accessor.text(&element).await?.trim().to_string())),
            None => {
                debug!("字段缺失: {}", locator);
                Ok(None)
            }
        }
    }

    /// 按字段表逐个提取，顺序与字段表一致
    pub async fn extract_schema<A: PageAccessor>(
        &self,
        accessor: &A,
        schema: &FieldSchema,
    ) -> AccessorResult<Vec<(String, Option<String>)>> {
        let mut values = Vec::with_capacity(schema.len());
        for field in schema.iter() {
            let value = self.extract(accessor, &field.locator).await?;
            values.push((field.name.clone(), value));
        }
        Ok(values)
    }
}
