//! Condition checks that fail with a specific [`Error`] kind.
//!
//! Every check comes in two forms: `kind(condition, message)` fails when the
//! condition is false, and `kind_from(result)` converts the error side of a
//! foreign `Result` into the same kind, keeping its message.
//!
//! ```
//! use nova_common::{validate, Error};
//!
//! let name = "";
//! let err = validate::inputs(!name.is_empty(), "name is required").unwrap_err();
//! assert!(matches!(err, Error::InvalidInputs(_)));
//!
//! let port: Result<u16, _> = "eighty".parse::<u16>();
//! assert!(matches!(validate::request_from(port), Err(Error::BadRequest(_))));
//! ```

use std::fmt;

use crate::error::{Error, Result};

macro_rules! checks {
    ($($(#[doc = $doc:expr])* $check:ident, $from:ident => $variant:ident;)+) => {
        $(
            $(#[doc = $doc])*
            pub fn $check(condition: bool, message: impl Into<String>) -> Result<()> {
                if condition {
                    Ok(())
                } else {
                    Err(Error::$variant(message.into()))
                }
            }

            #[doc = concat!("Map the error side of `result` to [`Error::", stringify!($variant), "`].")]
            pub fn $from<T, E: fmt::Display>(result: std::result::Result<T, E>) -> Result<T> {
                result.map_err(|e| Error::$variant(e.to_string()))
            }
        )+
    };
}

checks! {
    /// Internal invariant; fails with [`Error::Internal`].
    ensure, ensure_from => Internal;
    /// Malformed request; fails with [`Error::BadRequest`].
    request, request_from => BadRequest;
    /// Missing or bad credentials; fails with [`Error::Unauthorized`].
    authorized, authorized_from => Unauthorized;
    /// Invalid inputs; fails with [`Error::InvalidInputs`].
    inputs, inputs_from => InvalidInputs;
    /// Missing entity; fails with [`Error::NotFound`].
    exists, exists_from => NotFound;
    /// Unsupported body; fails with [`Error::UnsupportedContent`].
    content, content_from => UnsupportedContent;
    /// Unacceptable response type; fails with [`Error::NotAcceptable`].
    accepts, accepts_from => NotAcceptable;
    /// Disallowed operation; fails with [`Error::NotAllowed`].
    allowed, allowed_from => NotAllowed;
    /// Resource not ready; fails with [`Error::NotReady`].
    ready, ready_from => NotReady;
    /// Caller not permitted; fails with [`Error::Forbidden`].
    permitted, permitted_from => Forbidden;
}

/// Fail with a configuration error unless `condition` holds.
pub fn configured(condition: bool, message: impl Into<String>) -> Result<()> {
    if condition {
        Ok(())
    } else {
        Err(Error::Config(message.into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn passing_conditions_are_ok() {
        assert!(ensure(true, "x").is_ok());
        assert!(request(true, "x").is_ok());
        assert!(ready(true, "x").is_ok());
        assert!(configured(true, "x").is_ok());
    }

    #[test]
    fn failing_conditions_map_to_kinds() {
        assert_matches!(ensure(false, "x"), Err(Error::Internal(_)));
        assert_matches!(request(false, "x"), Err(Error::BadRequest(_)));
        assert_matches!(authorized(false, "x"), Err(Error::Unauthorized(_)));
        assert_matches!(inputs(false, "x"), Err(Error::InvalidInputs(_)));
        assert_matches!(exists(false, "x"), Err(Error::NotFound(_)));
        assert_matches!(content(false, "x"), Err(Error::UnsupportedContent(_)));
        assert_matches!(accepts(false, "x"), Err(Error::NotAcceptable(_)));
        assert_matches!(allowed(false, "x"), Err(Error::NotAllowed(_)));
        assert_matches!(ready(false, "x"), Err(Error::NotReady(_)));
        assert_matches!(permitted(false, "x"), Err(Error::Forbidden(_)));
        assert_matches!(configured(false, "x"), Err(Error::Config(_)));
    }

    #[test]
    fn message_is_kept() {
        let err = exists(false, "user 42").unwrap_err();
        assert_eq!(err.to_string(), "Not found: user 42");
    }

    #[test]
    fn from_keeps_ok_values_and_foreign_messages() {
        let ok: std::result::Result<u8, String> = Ok(7);
        assert_eq!(inputs_from(ok).unwrap(), 7);

        let bad: std::result::Result<u8, String> = Err("token expired".into());
        let err = authorized_from(bad).unwrap_err();
        assert_eq!(err.to_string(), "Unauthorized: token expired");
    }
}
