pub mod json;

pub use json::{read_json, read_json_lenient, to_json_bytes, write_json, write_json_if_changed};
