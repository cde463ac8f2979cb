// src/pipeline/readers/mod.rs

pub mod base_reader;
pub mod jsonl_reader;

pub use base_reader::BaseReader;
pub use jsonl_reader::JsonlReader;
