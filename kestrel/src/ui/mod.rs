//! Plain-text presentation of tables.

pub mod table;
