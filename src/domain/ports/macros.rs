//! Helper macro for generating domain port error enums.
//!
//! Every port error follows the same shape: a thiserror enum whose variants
//! carry context fields, plus snake_case constructor helpers accepting
//! `impl Into<_>` so adapters can pass `&str` where a `String` is stored.

macro_rules! define_port_error {
    (
        $(#[$outer:meta])*
        pub enum $name:ident {
            $(
                $(#[$variant_meta:meta])*
                $variant:ident { $($field:ident : $ty:ty),* $(,)? } => $message:expr
            ),* $(,)?
        }
    ) => {
        $(#[$outer])*
        #[derive(Debug, Clone, PartialEq, thiserror::Error)]
        pub enum $name {
            $(
                $(#[$variant_meta])*
                #[error($message)]
                $variant { $($field : $ty),* },
            )*
        }

        impl $name {
            ::paste::paste! {
                $(
                    pub fn [<$variant:snake>]($($field: impl Into<$ty>),*) -> Self {
                        Self::$variant { $($field: $field.into()),* }
                    }
                )*
            }
        }
    };
}

pub(crate) use define_port_error;

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.

    define_port_error! {
        /// Example error for macro coverage.
        pub enum ExamplePortError {
            Unreachable { message: String } => "unreachable: {message}",
            Rejected { status: u16 } => "rejected with status {status}",
        }
    }

    #[test]
    fn constructors_accept_str_for_string_fields() {
        let err = ExamplePortError::unreachable("boom");
        assert_eq!(err.to_string(), "unreachable: boom");
    }

    #[test]
    fn constructors_preserve_non_string_types() {
        let err = ExamplePortError::rejected(502u16);
        assert_eq!(err.to_string(), "rejected with status 502");
    }
}
