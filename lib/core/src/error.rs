//! Error handling foundation for flowcanvas.
//!
//! Only the `Result` alias lives here. Each crate owns its domain error
//! enums and returns them wrapped in a `Report`, e.g. the store's
//! `RepositoryResult<T>` is `Result<T, RepositoryError>`.

use rootcause::Report;

/// `Result` over a rootcause `Report` carrying context `C`.
pub type Result<T, C = ()> = std::result::Result<T, Report<C>>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::ParseIdError;

    fn parse_twice(raw: &str) -> Result<u8, ParseIdError> {
        if raw.is_empty() {
            return Err(ParseIdError {
                id_type: "ProjectId",
                reason: "empty".to_string(),
            }
            .into());
        }
        Ok(2)
    }

    #[test]
    fn ok_passes_through() {
        assert_eq!(parse_twice("x").expect("should be ok"), 2);
    }

    #[test]
    fn report_keeps_typed_context() {
        let err = parse_twice("").expect_err("should fail");
        assert_eq!(err.current_context().id_type, "ProjectId");
    }
}
