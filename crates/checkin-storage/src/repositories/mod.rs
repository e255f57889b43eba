pub mod scan_event;
pub mod user;

pub use scan_event::{ScanEventRepository, SqliteScanEventRepository, TimeColumn};
pub use user::{SqliteUserRepository, UserRepository};
