pub mod backfill_file;
pub mod tuya_http;

pub use backfill_file::BackfillFileSource;
pub use tuya_http::TuyaHttpSource;
