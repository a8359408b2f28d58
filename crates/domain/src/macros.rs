//! Macro for implementing Display and FromStr for domain enums
//!
//! Eliminates boilerplate for enums that travel as short wire or config
//! strings (connection status, auth kind, EWS sensitivity, ...). Parsing is
//! case-insensitive, output is the canonical lowercase form.
//!
//! # Example
//!
//! ```rust
//! use roomsync_domain::impl_domain_status_conversions;
//!
//! #[derive(Debug, Clone, Copy, PartialEq, Eq)]
//! pub enum FolderKind {
//!     Calendar,
//!     Inbox,
//! }
//!
//! impl_domain_status_conversions!(FolderKind {
//!     Calendar => "calendar",
//!     Inbox => "inbox",
//! });
//!
//! assert_eq!(FolderKind::Calendar.to_string(), "calendar");
//! assert_eq!("INBOX".parse::<FolderKind>().unwrap(), FolderKind::Inbox);
//! ```

/// Implements Display and FromStr traits for status enums
///
/// # Arguments
///
/// * `$enum_name` - The name of the enum type
/// * `$variant => $str` - Mapping of enum variants to their lowercase string
///   representations
#[macro_export]
macro_rules! impl_domain_status_conversions {
    ($enum_name:ident { $($variant:ident => $str:expr),+ $(,)? }) => {
        impl std::fmt::Display for $enum_name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                match self {
                    $(Self::$variant => write!(f, $str),)+
                }
            }
        }

        impl std::str::FromStr for $enum_name {
            type Err = String;

            fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
                match s.trim().to_lowercase().as_str() {
                    $($str => Ok(Self::$variant),)+
                    _ => Err(format!("Invalid {}: {}", stringify!($enum_name), s)),
                }
            }
        }
    };
}
