//! Macro for implementing Display and FromStr for status enums
//!
//! Status enums travel through logs and configuration files as short
//! lowercase names. This macro provides both conversions from a single
//! mapping table.
//!
//! # Example
//!
//! ```rust
//! use deferq_domain::impl_status_conversions;
//!
//! #[derive(Debug, Clone, Copy, PartialEq, Eq)]
//! pub enum Regime {
//!     Dormant,
//!     Active,
//! }
//!
//! impl_status_conversions!(Regime {
//!     Dormant => "dormant",
//!     Active => "active",
//! });
//!
//! assert_eq!(Regime::Active.to_string(), "active");
//! assert_eq!("DORMANT".parse::<Regime>(), Ok(Regime::Dormant));
//! ```

/// Implements Display and FromStr traits for status enums
///
/// Parsing is case-insensitive; display always uses the mapped string.
#[macro_export]
macro_rules! impl_status_conversions {
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

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.to_lowercase().as_str() {
                    $($str => Ok(Self::$variant),)+
                    _ => Err(format!("Invalid {}: {}", stringify!($enum_name), s)),
                }
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Disposition {
        Sent,
        Requeued,
        Dropped,
    }

    impl_status_conversions!(Disposition {
        Sent => "sent",
        Requeued => "requeued",
        Dropped => "dropped",
    });

    #[test]
    fn test_display_conversion() {
        assert_eq!(Disposition::Sent.to_string(), "sent");
        assert_eq!(Disposition::Requeued.to_string(), "requeued");
        assert_eq!(Disposition::Dropped.to_string(), "dropped");
    }

    #[test]
    fn test_fromstr_is_case_insensitive() {
        assert_eq!(Disposition::from_str("sent").unwrap(), Disposition::Sent);
        assert_eq!(Disposition::from_str("REQUEUED").unwrap(), Disposition::Requeued);
        assert_eq!(Disposition::from_str("DrOpPeD").unwrap(), Disposition::Dropped);
    }

    #[test]
    fn test_fromstr_invalid() {
        let result = Disposition::from_str("lost");
        assert!(result.unwrap_err().contains("Invalid Disposition: lost"));
        assert!(Disposition::from_str("").is_err());
    }
}
