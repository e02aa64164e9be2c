//! 表格类格式：xlsx / csv / json / pickle

use rust_xlsxwriter::{Format, Workbook};

use crate::error::PersistError;
use crate::models::Dataset;
use crate::services::persist::OutputFormat;

/// 工作表名称
pub const SHEET_NAME: &str = "stock";

pub fn render_csv(dataset: &Dataset) -> Result<Vec<u8>, PersistError> {
    let fail = |e: csv::Error| PersistError::render(OutputFormat::Csv, e);

    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(dataset.columns()).map_err(fail)?;
    for row in dataset.rows() {
        writer
            .write_record(row.iter().map(|cell| cell.unwrap_or("")))
            .map_err(fail)?;
    }
    writer
        .into_inner()
        .map_err(|e| PersistError::render(OutputFormat::Csv, e.to_string()))
}

/// 记录数组，每条记录包含全部列，缺失为 null
pub fn render_json(dataset: &Dataset) -> Result<Vec<u8>, PersistError> {
    let records: Vec<_> = dataset.record_views().collect();
    serde_json::to_vec(&records).map_err(|e| PersistError::render(OutputFormat::Json, e))
}

/// Python pickle：字典列表，缺失为 None
pub fn render_pickle(dataset: &Dataset) -> Result<Vec<u8>, PersistError> {
    let records: Vec<_> = dataset.record_views().collect();
    serde_pickle::to_vec(&records, serde_pickle::SerOptions::new())
        .map_err(|e| PersistError::render(OutputFormat::Pkl, e))
}

pub fn render_xlsx(dataset: &Dataset) -> Result<Vec<u8>, PersistError> {
    let fail = |e: rust_xlsxwriter::XlsxError| PersistError::render(OutputFormat::Xlsx, e);

    let mut workbook = Workbook::new();
    let header = Format::new().set_bold();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name(SHEET_NAME).map_err(fail)?;

    for (col, name) in dataset.columns().iter().enumerate() {
        worksheet
            .write_string_with_format(0, col as u16, name, &header)
            .map_err(fail)?;
    }
    for (row_index, row) in dataset.rows().enumerate() {
        for (col, cell) in row.iter().enumerate() {
            if let Some(value) = cell {
                worksheet
                    .write_string(row_index as u32 + 1, col as u16, *value)
                    .map_err(fail)?;
            }
        }
    }

    workbook.save_to_buffer().map_err(fail)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::EntityRecord;

    fn dataset() -> Dataset {
        let mut first = EntityRecord::new("u1");
        first.set("symbol", Some("BRK.B".into()));
        first.set("name", Some("Berkshire Hathaway, Inc.".into()));
        let mut second = EntityRecord::new("u2");
        second.set("symbol", Some("KO".into()));
        second.set("price", Some("70.01".into()));
        Dataset::from_records(vec![first, second])
    }

    #[test]
    fn test_csv_quotes_and_blank_absent() {
        let csv = String::from_utf8(render_csv(&dataset()).unwrap()).unwrap();
        assert_eq!(
            csv,
            "symbol,name,price\nBRK.B,\"Berkshire Hathaway, Inc.\",\nKO,,70.01\n"
        );
    }

    #[test]
    fn test_json_records() {
        let value: serde_json::Value =
            serde_json::from_slice(&render_json(&dataset()).unwrap()).unwrap();
        assert_eq!(value[1]["symbol"], "KO");
        assert!(value[1]["name"].is_null());
        assert_eq!(value.as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_pickle_roundtrips_as_value() {
        let bytes = render_pickle(&dataset()).unwrap();
        let value: serde_pickle::Value =
            serde_pickle::from_slice(&bytes, serde_pickle::DeOptions::new()).unwrap();
        assert!(matches!(value, serde_pickle::Value::List(ref items) if items.len() == 2));
    }

    #[test]
    fn test_xlsx_is_zip_container() {
        let bytes = render_xlsx(&dataset()).unwrap();
        assert_eq!(&bytes[..2], b"PK");
    }
}
