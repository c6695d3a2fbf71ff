pub mod change_logger;
pub mod csv;
pub mod flatten;

pub use change_logger::{ChangeLogger, RowSink};
pub use csv::CsvAppender;
pub use flatten::{flatten_rows, unix_now_secs};
