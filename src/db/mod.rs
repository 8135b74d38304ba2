// Destination document database

pub mod manager;
pub mod migrations;
pub mod storage;

pub use manager::{normalize_store_name, StorageManager};
pub use storage::{Document, Storage, StorageInfo};
