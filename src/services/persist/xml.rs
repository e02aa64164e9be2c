//! XML 格式
//!
//! 列名会被改写成合法的元素名；改写只作用于 XML 输出，数据集本身不变。

use std::collections::HashSet;

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;

use crate::error::PersistError;
use crate::models::Dataset;
use crate::services::persist::OutputFormat;

const ROOT: &str = "data";
const ROW: &str = "row";
const PREFIX: char = '_';

/// 把列名改写成合法的 XML 元素名
///
/// 非法字符替换为 `_`；首字符不是字母或 `_` 时加 `_` 前缀。
pub fn xml_identifier(name: &str) -> String {
    let body: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.') {
                c
            } else {
                PREFIX
            }
        })
        .collect();

    match body.chars().next() {
        Some(c) if c.is_ascii_alphabetic() || c == PREFIX => body,
        _ => format!("{}{}", PREFIX, body),
    }
}

/// 为每一列生成元素名，改写后重名的列依次加 `_2`、`_3` 后缀
fn unique_tags(columns: &[String]) -> Vec<String> {
    let mut taken = HashSet::new();
    columns
        .iter()
        .map(|column| {
            let base = xml_identifier(column);
            let mut tag = base.clone();
            let mut n = 2;
            while !taken.insert(tag.clone()) {
                tag = format!("{}_{}", base, n);
                n += 1;
            }
            tag
        })
        .collect()
}

pub fn render_xml(dataset: &Dataset) -> Result<Vec<u8>, PersistError> {
    let fail = |e| PersistError::render(OutputFormat::Xml, e);
    let tags = unique_tags(dataset.columns());

    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
    writer
        .write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))
        .map_err(fail)?;
    writer
        .write_event(Event::Start(BytesStart::new(ROOT)))
        .map_err(fail)?;

    for row in dataset.rows() {
        writer
            .write_event(Event::Start(BytesStart::new(ROW)))
            .map_err(fail)?;
        for (tag, cell) in tags.iter().zip(row) {
            match cell {
                Some(value) => {
                    writer
                        .write_event(Event::Start(BytesStart::new(tag.as_str())))
                        .map_err(fail)?;
                    writer
                        .write_event(Event::Text(BytesText::new(value)))
                        .map_err(fail)?;
                    writer
                        .write_event(Event::End(BytesEnd::new(tag.as_str())))
                        .map_err(fail)?;
                }
                None => {
                    writer
                        .write_event(Event::Empty(BytesStart::new(tag.as_str())))
                        .map_err(fail)?;
                }
            }
        }
        writer
            .write_event(Event::End(BytesEnd::new(ROW)))
            .map_err(fail)?;
    }

    writer
        .write_event(Event::End(BytesEnd::new(ROOT)))
        .map_err(fail)?;
    Ok(writer.into_inner())
}
