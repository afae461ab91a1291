pub mod csv;
pub mod excel;
pub mod http;
pub mod sql;

pub use csv::{CsvReader, CsvSettings};
pub use excel::{ExcelReader, ExcelSettings};
pub use http::{HttpReader, HttpSettings};
pub use sql::{SqlReader, SqlSettings};
