use std::borrow::Cow;


/// One value read from a result row.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum CellValue {
    Integer(i64),
    Float(f64),
    Bytes(Vec<u8>),
    Other(String),
}

impl CellValue {
    /// SQL NULL renders as an empty text cell.
    pub fn null() -> Self {
        CellValue::Other(String::new())
    }

    /// Text form used for string cells; `None` for numeric values.
    pub fn as_text(&self) -> Option<Cow<'_, str>> {
        match self {
            CellValue::Integer(_) | CellValue::Float(_) => None,
            CellValue::Bytes(bytes) => Some(String::from_utf8_lossy(bytes)),
            CellValue::Other(text) => Some(Cow::Borrowed(text)),
        }
    }
}

/// Column names plus every row read from the cursor, in cursor order.
#[derive(Debug, Clone, Default)]
pub(crate) struct ResultSet {
    columns: Vec<String>,
    rows: Vec<Vec<CellValue>>,
}

impl ResultSet {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    /// Appends a row. Rejects rows whose width differs from the column list
    /// and hands the row back.
    pub fn push_row(&mut self, row: Vec<CellValue>) -> Result<(), Vec<CellValue>> {
        if row.len() != self.columns.len() {
            return Err(row);
        }
        self.rows.push(row);
        Ok(())
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<CellValue>] {
        &self.rows
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_row_enforces_width() {
        let mut result_set = ResultSet::new(vec!["id".to_string(), "price".to_string()]);
        assert!(result_set
            .push_row(vec![CellValue::Integer(1), CellValue::Float(9.5)])
            .is_ok());

        let rejected = result_set.push_row(vec![CellValue::Integer(2)]).unwrap_err();
        assert_eq!(rejected, vec![CellValue::Integer(2)]);
        assert_eq!(result_set.row_count(), 1);
        assert_eq!(result_set.column_count(), 2);
    }

    #[test]
    fn test_rows_keep_insertion_order() {
        let mut result_set = ResultSet::new(vec!["n".to_string()]);
        for n in [3, 1, 2] {
            result_set.push_row(vec![CellValue::Integer(n)]).unwrap();
        }
        let order: Vec<_> = result_set.rows().iter().map(|row| row[0].clone()).collect();
        assert_eq!(
            order,
            vec![CellValue::Integer(3), CellValue::Integer(1), CellValue::Integer(2)]
        );
    }

    #[test]
    fn test_as_text() {
        assert_eq!(CellValue::Integer(1).as_text(), None);
        assert_eq!(CellValue::Float(1.0).as_text(), None);
        assert_eq!(
            CellValue::Bytes("héllo".as_bytes().to_vec()).as_text().unwrap(),
            "héllo"
        );
        assert_eq!(CellValue::Other("2024-01-02".into()).as_text().unwrap(), "2024-01-02");
        assert_eq!(CellValue::null().as_text().unwrap(), "");
    }
}
