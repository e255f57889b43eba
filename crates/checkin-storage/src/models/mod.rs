pub mod scan_event;
pub mod user;

pub use scan_event::{NewScanEvent, ScanEvent};
pub use user::User;
