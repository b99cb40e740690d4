use std::fmt::{self, Display};

use crate::confgen::Field;

/// A single renderable configuration value.
#[derive(Clone, Debug, PartialEq)]
pub enum Scalar {
    String(String),
    Int(i64),
    Float(f64),
    Bool(bool),
}

impl Scalar {
    /// Whether this is the zero value of its kind. Zero scalars are omitted
    /// from rendered output unless the owning field is explicit-optional.
    pub fn is_zero(&self) -> bool {
        match self {
            Scalar::String(value) => value.is_empty(),
            Scalar::Int(value) => *value == 0,
            Scalar::Float(value) => *value == 0.0,
            Scalar::Bool(value) => !*value,
        }
    }
}

impl Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::String(value) => f.write_str(value),
            Scalar::Int(value) => write!(f, "{value}"),
            Scalar::Float(value) => write!(f, "{value}"),
            // The products parse booleans as 1/0.
            Scalar::Bool(value) => f.write_str(if *value { "1" } else { "0" }),
        }
    }
}

impl From<&str> for Scalar {
    fn from(value: &str) -> Self {
        Scalar::String(value.to_owned())
    }
}

impl From<String> for Scalar {
    fn from(value: String) -> Self {
        Scalar::String(value)
    }
}

impl From<&String> for Scalar {
    fn from(value: &String) -> Self {
        Scalar::String(value.clone())
    }
}

impl From<i64> for Scalar {
    fn from(value: i64) -> Self {
        Scalar::Int(value)
    }
}

impl From<i32> for Scalar {
    fn from(value: i32) -> Self {
        Scalar::Int(value.into())
    }
}

impl From<u16> for Scalar {
    fn from(value: u16) -> Self {
        Scalar::Int(value.into())
    }
}

impl From<u32> for Scalar {
    fn from(value: u32) -> Self {
        Scalar::Int(value.into())
    }
}

impl From<f64> for Scalar {
    fn from(value: f64) -> Self {
        Scalar::Float(value)
    }
}

impl From<bool> for Scalar {
    fn from(value: bool) -> Self {
        Scalar::Bool(value)
    }
}

/// The value at a section position.
///
/// Sections come from optional, dynamically assembled parts of a product
/// specification, so a non-record value can reach the renderer. That case is
/// a programming error in the assembly code and is reported as
/// [`Error::NotARecord`](crate::confgen::Error::NotARecord).
#[derive(Clone, Debug, PartialEq)]
pub enum SectionValue {
    /// An intentionally absent section. Skipped entirely: no header, no
    /// lines.
    Absent,
    Record(Vec<Field>),
    Scalar(Scalar),
}

impl SectionValue {
    pub fn record(fields: impl IntoIterator<Item = Field>) -> Self {
        SectionValue::Record(fields.into_iter().collect())
    }
}

#[cfg(test)]
mod test {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(Scalar::from(""), true)]
    #[case(Scalar::from("h"), false)]
    #[case(Scalar::from(0), true)]
    #[case(Scalar::from(8787), false)]
    #[case(Scalar::from(0.0), true)]
    #[case(Scalar::from(false), true)]
    #[case(Scalar::from(true), false)]
    fn zero_values(#[case] scalar: Scalar, #[case] is_zero: bool) {
        assert_eq!(scalar.is_zero(), is_zero);
    }

    #[rstest]
    #[case(Scalar::from("https://x"), "https://x")]
    #[case(Scalar::from(8787), "8787")]
    #[case(Scalar::from(true), "1")]
    #[case(Scalar::from(false), "0")]
    #[case(Scalar::from(1.5), "1.5")]
    fn display(#[case] scalar: Scalar, #[case] expected: &str) {
        assert_eq!(scalar.to_string(), expected);
    }
}
