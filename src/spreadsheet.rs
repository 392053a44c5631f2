//! Builds the xlsx document for a [`ResultSet`].

use std::path::Path;

use rust_xlsxwriter::{ColNum, DocProperties, ExcelDateTime, Format, RowNum, Workbook, Worksheet};

use crate::error::{ExportError, SaveError};
use crate::types::{CellValue, ResultSet};

pub(crate) const SHEET_NAME: &str = "Sheet1";
pub(crate) const FLOAT_FORMAT: &str = "0.00";

/// A single-sheet workbook: the header row followed by one row per result row.
pub(crate) struct SpreadsheetDocument {
    workbook: Workbook,
    row_count: u32,
}

impl SpreadsheetDocument {
    pub fn from_result_set(result_set: &ResultSet) -> Result<Self, ExportError> {
        let mut workbook = Workbook::new();

        // Pinned so identical results encode to identical bytes.
        let created = ExcelDateTime::from_ymd(2000, 1, 1).map_err(ExportError::SheetCreation)?;
        workbook.set_properties(&DocProperties::new().set_creation_datetime(&created));

        let float_format = Format::new().set_num_format(FLOAT_FORMAT);
        let worksheet = workbook.add_worksheet();
        worksheet
            .set_name(SHEET_NAME)
            .map_err(ExportError::SheetCreation)?;

        for (col, name) in result_set.columns().iter().enumerate() {
            worksheet
                .write_string(0, col_num(col)?, name.as_str())
                .map_err(SaveError::from)?;
        }

        let mut row_count: u32 = 1;
        for values in result_set.rows() {
            for (col, value) in values.iter().enumerate() {
                write_cell(worksheet, row_count, col_num(col)?, value, &float_format)?;
            }
            row_count += 1;
        }

        Ok(Self {
            workbook,
            row_count,
        })
    }

    /// Rows written, header included.
    pub fn row_count(&self) -> u32 {
        self.row_count
    }

    pub fn save(&mut self, path: &Path) -> Result<(), ExportError> {
        self.workbook.save(path).map_err(SaveError::from)?;
        Ok(())
    }

    #[cfg(test)]
    pub fn to_bytes(&mut self) -> Result<Vec<u8>, ExportError> {
        Ok(self.workbook.save_to_buffer().map_err(SaveError::from)?)
    }
}

fn write_cell(
    worksheet: &mut Worksheet,
    row: RowNum,
    col: ColNum,
    value: &CellValue,
    float_format: &Format,
) -> Result<(), SaveError> {
    match value {
        CellValue::Integer(v) => worksheet.write_number(row, col, *v as f64)?,
        CellValue::Float(v) => worksheet.write_number_with_format(row, col, *v, float_format)?,
        CellValue::Bytes(_) | CellValue::Other(_) => {
            let text = value.as_text().unwrap_or_default();
            worksheet.write_string(row, col, text.as_ref())?
        }
    };
    Ok(())
}

fn col_num(col: usize) -> Result<ColNum, SaveError> {
    ColNum::try_from(col).map_err(|_| {
        SaveError::Encode(rust_xlsxwriter::XlsxError::RowColumnLimitError)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use calamine::{open_workbook_from_rs, Data, Reader, Xlsx};
    use std::io::{Cursor, Read};

    fn items() -> ResultSet {
        let mut result_set = ResultSet::new(vec!["id".to_string(), "price".to_string()]);
        result_set
            .push_row(vec![CellValue::Integer(1), CellValue::Float(9.5)])
            .unwrap();
        result_set
            .push_row(vec![CellValue::Integer(2), CellValue::Float(10.0)])
            .unwrap();
        result_set
    }

    fn read_sheet(bytes: Vec<u8>) -> Vec<Vec<Data>> {
        let mut workbook: Xlsx<_> = open_workbook_from_rs(Cursor::new(bytes)).unwrap();
        let range = workbook.worksheet_range(SHEET_NAME).unwrap();
        range.rows().map(|row| row.to_vec()).collect()
    }

    fn package_part(bytes: &[u8], name: &str) -> String {
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        let mut part = String::new();
        archive
            .by_name(name)
            .unwrap()
            .read_to_string(&mut part)
            .unwrap();
        part
    }

    fn styles_xml(bytes: &[u8]) -> String {
        package_part(bytes, "xl/styles.xml")
    }

    #[test]
    fn test_header_and_rows() {
        let mut document = SpreadsheetDocument::from_result_set(&items()).unwrap();
        assert_eq!(document.row_count(), 3);

        let rows = read_sheet(document.to_bytes().unwrap());
        assert_eq!(
            rows,
            vec![
                vec![Data::String("id".into()), Data::String("price".into())],
                vec![Data::Float(1.0), Data::Float(9.5)],
                vec![Data::Float(2.0), Data::Float(10.0)],
            ]
        );
    }

    #[test]
    fn test_floats_use_two_decimal_format() {
        let mut document = SpreadsheetDocument::from_result_set(&items()).unwrap();
        let styles = styles_xml(&document.to_bytes().unwrap());
        assert!(styles.contains(r#"formatCode="0.00""#), "{styles}");
    }

    #[test]
    fn test_integers_only_have_no_float_format() {
        let mut result_set = ResultSet::new(vec!["n".to_string()]);
        result_set.push_row(vec![CellValue::Integer(7)]).unwrap();
        let mut document = SpreadsheetDocument::from_result_set(&result_set).unwrap();
        let bytes = document.to_bytes().unwrap();
        assert!(!styles_xml(&bytes).contains(r#"formatCode="0.00""#));
        assert_eq!(read_sheet(bytes)[1], vec![Data::Float(7.0)]);
    }

    #[test]
    fn test_text_cells() {
        let mut result_set = ResultSet::new(vec!["name".to_string(), "created".to_string()]);
        result_set
            .push_row(vec![
                CellValue::Bytes("Grüße".as_bytes().to_vec()),
                CellValue::Other("2024-01-02 03:04:05".to_string()),
            ])
            .unwrap();

        let mut document = SpreadsheetDocument::from_result_set(&result_set).unwrap();
        let rows = read_sheet(document.to_bytes().unwrap());
        assert_eq!(
            rows[1],
            vec![
                Data::String("Grüße".into()),
                Data::String("2024-01-02 03:04:05".into())
            ]
        );
    }

    #[test]
    fn test_empty_result_has_header_only() {
        let result_set = ResultSet::new(vec!["a".to_string(), "b".to_string()]);
        let mut document = SpreadsheetDocument::from_result_set(&result_set).unwrap();
        assert_eq!(document.row_count(), 1);

        let rows = read_sheet(document.to_bytes().unwrap());
        assert_eq!(
            rows,
            vec![vec![Data::String("a".into()), Data::String("b".into())]]
        );
    }

    #[test]
    fn test_creation_time_is_pinned() {
        let mut document = SpreadsheetDocument::from_result_set(&items()).unwrap();
        let core = package_part(&document.to_bytes().unwrap(), "docProps/core.xml");
        assert!(core.contains("2000-01-01T00:00:00Z"), "{core}");
    }

    #[test]
    fn test_same_result_same_bytes() {
        let first = SpreadsheetDocument::from_result_set(&items())
            .unwrap()
            .to_bytes()
            .unwrap();
        let second = SpreadsheetDocument::from_result_set(&items())
            .unwrap()
            .to_bytes()
            .unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_save_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.xlsx");
        let mut document = SpreadsheetDocument::from_result_set(&items()).unwrap();
        document.save(&path).unwrap();

        let rows = read_sheet(std::fs::read(&path).unwrap());
        assert_eq!(rows.len(), 3);
    }
}
