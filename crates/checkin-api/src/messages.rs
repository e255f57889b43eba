//! Response texts of the check-in endpoint
//!
//! Readers and the kiosk front end match on these strings, so they are
//! kept byte for byte, Japanese texts included.
//!
//! # Usage
//!
//! ```
//! use checkin_api::messages::ResponseMessages;
//!
//! assert_eq!(ResponseMessages::success(42), "Success: id 42");
//! ```

/// Payload texts returned by the check-in handler
pub struct ResponseMessages;

impl ResponseMessages {
    /// Request arrived outside opening hours
    pub const CLOSED: &'static str = "終了です";

    /// POST without the required fields, or with badly typed values
    pub const VALIDATION_FAILED: &'static str = "validation failed";

    /// Scan recorded, but the tag has no owner
    pub const CHECK_TAG: &'static str = "ユーザーのTAGIDを確認してください。";

    /// Dev request: parameters echoed, nothing written
    ///
    /// The double space is part of the text readers expect.
    pub const DEV_MODE: &'static str = "* DEV MODE ACTIVED * DATA wont  be recorded";

    /// Scan could not be recorded
    pub const RECORD_FAILED: &'static str = "Error 0X59310";

    /// Any method other than GET or POST
    pub const CONNECTED: &'static str = "Connected";

    /// GET without a tag
    pub const MISSING_TAG: &'static str = "parameter [tag_id] is missing";

    /// GET while the database cannot be read
    pub const DATABASE_UNAVAILABLE: &'static str = "database unavailable";

    /// Setup problem surfacing at request time
    pub const INTERNAL_ERROR: &'static str = "internal error";

    pub fn success(id: i64) -> String {
        format!("Success: id {id}")
    }

    /// `literal` is echoed exactly as submitted
    pub fn tag_not_found(literal: &str) -> String {
        format!("TAGID [{literal}] not found")
    }
}
