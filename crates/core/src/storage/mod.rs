pub mod export;
pub mod json_file;
pub mod memory;
pub mod records;
pub mod traits;
