//! Reading and writing delimited tables.

pub mod csv_io;

pub use csv_io::{read_table, write_table};
