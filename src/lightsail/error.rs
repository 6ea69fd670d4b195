//! Translation of SDK errors into [`ProviderError`].

use std::fmt::Debug;

use aws_sdk_lightsail::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};

use crate::provider::{ProviderError, ProviderErrorKind};

/// Maps an AWS error code onto the closed provider error set.
#[must_use]
pub fn classify_code(code: Option<&str>) -> ProviderErrorKind {
    match code {
        Some("NotFoundException" | "DoesNotExist") => ProviderErrorKind::NotFound,
        Some("InvalidInputException") => ProviderErrorKind::InvalidInput,
        Some(
            "AccessDeniedException"
            | "UnauthenticatedException"
            | "UnrecognizedClientException"
            | "InvalidClientTokenId"
            | "InvalidSignatureException"
            | "ExpiredTokenException",
        ) => ProviderErrorKind::Credentials,
        _ => ProviderErrorKind::Other,
    }
}

pub(super) fn translate<E, R>(operation: &'static str, err: &SdkError<E, R>) -> ProviderError
where
    E: ProvideErrorMetadata + std::error::Error + 'static,
    R: Debug,
{
    let kind = classify_code(err.code());
    let message = err
        .message()
        .map_or_else(|| DisplayErrorContext(err).to_string(), str::to_owned);
    ProviderError::new(operation, kind, message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(Some("NotFoundException"), ProviderErrorKind::NotFound)]
    #[case(Some("DoesNotExist"), ProviderErrorKind::NotFound)]
    #[case(Some("InvalidInputException"), ProviderErrorKind::InvalidInput)]
    #[case(Some("UnauthenticatedException"), ProviderErrorKind::Credentials)]
    #[case(Some("ServiceException"), ProviderErrorKind::Other)]
    #[case(None, ProviderErrorKind::Other)]
    fn codes_map_to_kinds(#[case] code: Option<&str>, #[case] expected: ProviderErrorKind) {
        assert_eq!(classify_code(code), expected);
    }
}
