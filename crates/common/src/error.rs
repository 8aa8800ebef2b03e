/// Error types that can be built from a plain message.
///
/// Implement it for a crate error and call [`impl_context!`] in that crate's
/// error module to get `.context()` / `.with_context()` on `Result` and
/// `Option`.
pub trait FromMessage: Sized {
    fn from_message(message: String) -> Self;
}

/// Generate a crate-local `Context` extension trait.
///
/// The invoking module must define `Error: FromMessage` and
/// `type Result<T> = std::result::Result<T, Error>`.
///
/// ```ignore
/// // crates/config/src/error.rs
/// murmur_common::impl_context!();
/// ```
#[macro_export]
macro_rules! impl_context {
    () => {
        pub trait Context<T> {
            fn context(self, context: impl std::fmt::Display) -> Result<T>;

            fn with_context<C, F>(self, f: F) -> Result<T>
            where
                C: std::fmt::Display,
                F: FnOnce() -> C;
        }

        impl<T, E: std::fmt::Display> Context<T> for std::result::Result<T, E> {
            fn context(self, context: impl std::fmt::Display) -> Result<T> {
                self.with_context(|| context)
            }

            fn with_context<C, F>(self, f: F) -> Result<T>
            where
                C: std::fmt::Display,
                F: FnOnce() -> C,
            {
                self.map_err(|source| {
                    <Error as $crate::FromMessage>::from_message(format!("{}: {source}", f()))
                })
            }
        }

        impl<T> Context<T> for Option<T> {
            fn context(self, context: impl std::fmt::Display) -> Result<T> {
                self.with_context(|| context)
            }

            fn with_context<C, F>(self, f: F) -> Result<T>
            where
                C: std::fmt::Display,
                F: FnOnce() -> C,
            {
                self.ok_or_else(|| <Error as $crate::FromMessage>::from_message(f().to_string()))
            }
        }
    };
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    mod scoped {
        #[derive(Debug, thiserror::Error)]
        #[error("{0}")]
        pub struct Error(String);

        impl crate::FromMessage for Error {
            fn from_message(message: String) -> Self {
                Self(message)
            }
        }

        pub type Result<T> = std::result::Result<T, Error>;

        crate::impl_context!();
    }

    use scoped::Context;

    #[test]
    fn result_context_prefixes_source() {
        let parsed: Result<u8, _> = "x".parse::<u8>();
        let err = parsed.context("reading level").unwrap_err();
        assert!(err.to_string().starts_with("reading level: "));
    }

    #[test]
    fn option_context_uses_message() {
        let err = None::<u8>.with_context(|| "missing level").unwrap_err();
        assert_eq!(err.to_string(), "missing level");
    }
}
