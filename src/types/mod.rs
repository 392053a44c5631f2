pub(crate) mod cell;
pub(crate) mod dto;

pub(crate) use cell::{CellValue, ResultSet};
pub(crate) use dto::{ErrorBody, ExportRequest, HelloResponse};
