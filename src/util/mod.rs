pub mod file_backed_json;
pub mod fixed_rb;
pub mod format_bytes;
