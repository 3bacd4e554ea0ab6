pub mod datetime;
pub mod decoder;
pub mod format;
pub mod parser;
pub mod reader;
pub mod source;
