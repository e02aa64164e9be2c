//! 实体处理上下文
//!
//! 封装"我正在处理第几个实体、它在哪"这一信息

use std::fmt::Display;

/// 实体处理上下文
#[derive(Debug, Clone)]
pub struct EntityCtx {
    /// 详情页 URL
    pub url: String,

    /// 实体在本次运行中的序号（从1开始）
    pub index: usize,

    /// 本次运行的实体总数（仅用于日志显示）
    pub total: usize,
}

impl EntityCtx {
    /// 创建新的实体上下文
    pub fn new(url: impl Into<String>, index: usize, total: usize) -> Self {
        Self {
            url: url.into(),
            index,
            total,
        }
    }
}

impl Display for EntityCtx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[实体 {}/{}]", self.index, self.total)
    }
}
