use indexmap::IndexMap;
use serde::ser::{Serialize, SerializeMap, Serializer};

/// 单个实体的扁平记录
///
/// 字段名 → 可缺失的值，保持插入顺序；同名字段后写覆盖先写，
/// 但保留第一次出现时的位置。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntityRecord {
    /// 详情页 URL（不作为数据列）
    pub url: String,
    fields: IndexMap<String, Option<String>>,
}

impl EntityRecord {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            fields: IndexMap::new(),
        }
    }

    /// 写入字段，冲突时后写覆盖
    pub fn set(&mut self, name: impl Into<String>, value: Option<String>) {
        self.fields.insert(name.into(), value);
    }

    /// 字段值；字段不存在或值缺失时都返回 None
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields.get(name).and_then(|v| v.as_deref())
    }

    /// 字段是否被探测过（值可能缺失）
    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&str>)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_deref()))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// 实体的历史子资源：表头 + 等宽的行
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryRecord {
    /// 所属实体的标识字段值
    pub symbol: Option<String>,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// 一次运行的全部实体记录
///
/// 列集合是所有记录字段名的并集，按首次出现的顺序排列。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Dataset {
    columns: Vec<String>,
    records: Vec<EntityRecord>,
}

impl Dataset {
    pub fn from_records(records: Vec<EntityRecord>) -> Self {
        let mut seen: IndexMap<&str, ()> = IndexMap::new();
        for record in &records {
            for name in record.field_names() {
                seen.entry(name).or_insert(());
            }
        }
        let columns = seen.keys().map(|s| s.to_string()).collect();
        Self { columns, records }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn records(&self) -> &[EntityRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// 按列顺序展开的单元格，缺失为 None
    pub fn rows(&self) -> impl Iterator<Item = Vec<Option<&str>>> + '_ {
        self.records
            .iter()
            .map(move |r| self.columns.iter().map(|c| r.get(c)).collect())
    }

    /// 以记录视图序列化（每条记录包含全部列）
    pub fn record_views(&self) -> impl Iterator<Item = RecordView<'_>> + '_ {
        self.records.iter().map(move |record| RecordView {
            columns: &self.columns,
            record,
        })
    }
}

/// 覆盖全部列的记录视图，缺失列序列化为 null
pub struct RecordView<'a> {
    columns: &'a [String],
    record: &'a EntityRecord,
}

impl Serialize for RecordView<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.columns.len()))?;
        for column in self.columns {
            map.serialize_entry(column, &self.record.get(column))?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overwrite_keeps_first_position() {
        let mut record = EntityRecord::new("u");
        record.set("a", Some("1".into()));
        record.set("b", Some("2".into()));
        record.set("a", Some("3".into()));

        assert_eq!(record.get("a"), Some("3"));
        assert_eq!(record.field_names().collect::<Vec<_>>(), vec!["a", "b"]);
    }

    #[test]
    fn test_dataset_column_union() {
        let mut first = EntityRecord::new("u1");
        first.set("symbol", Some("AAPL".into()));
        first.set("price", None);
        let mut second = EntityRecord::new("u2");
        second.set("symbol", Some("MSFT".into()));
        second.set("sector", Some("Technology".into()));

        let dataset = Dataset::from_records(vec![first, second]);
        assert_eq!(dataset.columns(), ["symbol", "price", "sector"]);

        let rows: Vec<_> = dataset.rows().collect();
        assert_eq!(rows[0], vec![Some("AAPL"), None, None]);
        assert_eq!(rows[1], vec![Some("MSFT"), None, Some("Technology")]);
    }

    #[test]
    fn test_record_view_serializes_all_columns() {
        let mut first = EntityRecord::new("u1");
        first.set("a", Some("1".into()));
        let mut second = EntityRecord::new("u2");
        second.set("b", Some("2".into()));
        let dataset = Dataset::from_records(vec![first, second]);

        let json = serde_json::to_string(&dataset.record_views().collect::<Vec<_>>()).unwrap();
        assert_eq!(json, r#"[{"a":"1","b":null},{"a":null,"b":"2"}]"#);
    }
}
