//! Domain types: money, revenue split, payment lifecycle, and the stored entities.

/// Implements `as_str`, `Display` and `FromStr` for enums persisted as TEXT columns.
macro_rules! text_enum {
    ($ty:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $ty {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($ty::$variant => $text),+
                }
            }
        }

        impl std::fmt::Display for $ty {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $ty {
            type Err = $crate::error::AppError;

            fn from_str(s: &str) -> $crate::error::Result<Self> {
                match s {
                    $($text => Ok($ty::$variant),)+
                    other => Err($crate::error::AppError::Internal(format!(
                        "unknown {} '{}'",
                        stringify!($ty),
                        other
                    ))),
                }
            }
        }
    };
}

pub mod model;
pub mod money;
pub mod payment;
pub mod revenue;
