// src/process/mod.rs
pub mod batch;
pub mod csv_stream;
pub mod date_parser;
pub mod normalize;
pub mod utils;
