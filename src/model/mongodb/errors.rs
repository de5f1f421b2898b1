//! The mongodb crate doesn't expose error code constants; this module
//! defines the ones we match on.

use mongodb::error::{Error as DbError, ErrorKind, WriteFailure};

pub const DUPLICATE_KEY: i32 = 11000;

/// Return true if the given error is a duplicate-key write error.
pub fn is_duplicate_key_error(err: &DbError) -> bool {
    if let ErrorKind::Write(WriteFailure::WriteError(ref e)) = *err.kind {
        e.code == DUPLICATE_KEY
    } else {
        false
    }
}
