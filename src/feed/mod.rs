pub mod fields;
pub mod messages;

pub use fields::{first_present, OutcomeFields};
pub use messages::{frame_lines, parse_change_line};
