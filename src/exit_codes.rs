//! Exit code constants for the docstore CLI.
//!
//! - 0: Success
//! - 1: User error (bad args, invalid config)
//! - 2: Invalid directives or path expression
//! - 4: Lock acquisition failure or timeout
//! - 5: Document accessed without holding the lock
//! - 6: Document could not be persisted
//! - 7: Backing file unreadable or malformed

/// Successful execution.
pub const SUCCESS: i32 = 0;

/// User error: bad arguments or invalid configuration.
pub const USER_ERROR: i32 = 1;

/// Directive list or path expression could not be parsed or applied.
pub const INVALID_INPUT: i32 = 2;

/// Lock acquisition failure: the lock could not be created, acquired or released in time.
pub const LOCK_FAILURE: i32 = 4;

/// Read or mutation attempted without holding the lock.
pub const MISUSE: i32 = 5;

/// The mutated document could not be written back.
pub const PERSIST_FAILURE: i32 = 6;

/// The backing document could not be read or parsed.
pub const DOCUMENT_FAILURE: i32 = 7;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_are_distinct() {
        let codes = [
            SUCCESS,
            USER_ERROR,
            INVALID_INPUT,
            LOCK_FAILURE,
            MISUSE,
            PERSIST_FAILURE,
            DOCUMENT_FAILURE,
        ];
        for (i, &a) in codes.iter().enumerate() {
            for (j, &b) in codes.iter().enumerate() {
                if i != j {
                    assert_ne!(a, b, "Exit codes must be distinct");
                }
            }
        }
    }
}
