//! Kubernetes resource quantity parsing.
//!
//! Implements enough of the [Kubernetes serialization format][format] to
//! compare resource magnitudes: a floating point value with an optional
//! binary byte-multiple (`Ki` to `Ei`), decimal byte-multiple (`m`, `k`,
//! `M`, `G`, `T`, `P`, `E`) or scientific-notation suffix. We opt for `f64`
//! instead of the arbitrary-precision arithmetic of the Go implementation;
//! profile ranking does not need numbers that large.
//!
//! [format]: https://github.com/kubernetes/apimachinery/blob/8c60292e48e46c4faa1e92acb232ce6adb37512c/pkg/api/resource/quantity.go#L37-L59

use std::{
    fmt::{self, Display, Write as _},
    num::ParseFloatError,
    str::FromStr,
};

use snafu::{ResultExt as _, Snafu, ensure};

#[derive(Debug, PartialEq, Snafu)]
pub enum ParseQuantityError {
    #[snafu(display("input is either empty or contains non-ascii characters"))]
    InvalidFormat,

    #[snafu(display("failed to parse floating point number"))]
    InvalidFloat { source: ParseFloatError },

    #[snafu(display("failed to parse {suffix:?} as quantity suffix"))]
    InvalidSuffix { suffix: String },
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Quantity {
    value: f64,
    suffix: Option<Suffix>,
}

impl FromStr for Quantity {
    type Err = ParseQuantityError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        ensure!(!input.is_empty() && input.is_ascii(), InvalidFormatSnafu);

        match input.find(|c: char| c != '.' && !c.is_ascii_digit()) {
            Some(suffix_index) => {
                let (number, suffix) = input.split_at(suffix_index);
                let value = f64::from_str(number).context(InvalidFloatSnafu)?;
                let suffix = Suffix::from_str(suffix)?;

                Ok(Self {
                    suffix: Some(suffix),
                    value,
                })
            }
            None => {
                let value = f64::from_str(input).context(InvalidFloatSnafu)?;
                Ok(Self {
                    value,
                    suffix: None,
                })
            }
        }
    }
}

impl Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.value == 0.0 {
            return f.write_char('0');
        }

        match &self.suffix {
            Some(suffix) => write!(f, "{value}{suffix}", value = self.value),
            None => write!(f, "{value}", value = self.value),
        }
    }
}

impl Quantity {
    /// The canonical scalar value, `value * base^exponent`. This is the
    /// quantity scaled down to its suffix-less unit, so quantities with
    /// different suffixes become directly comparable.
    pub fn scalar(&self) -> f64 {
        match &self.suffix {
            Some(suffix) => self.value * (suffix.base() as f64).powf(suffix.exponent()),
            None => self.value,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Suffix {
    Binary(BinaryMultiple),
    Decimal(DecimalMultiple),
    /// Scientific (E) notation, `1.5e3`.
    Exponent(f64),
}

impl FromStr for Suffix {
    type Err = ParseQuantityError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        if let Ok(binary) = BinaryMultiple::from_str(input) {
            return Ok(Self::Binary(binary));
        }

        if let Ok(decimal) = DecimalMultiple::from_str(input) {
            return Ok(Self::Decimal(decimal));
        }

        if input.starts_with(['e', 'E']) {
            if let Ok(exponent) = f64::from_str(&input[1..]) {
                return Ok(Self::Exponent(exponent));
            }
        }

        InvalidSuffixSnafu { suffix: input }.fail()
    }
}

impl Display for Suffix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Suffix::Binary(binary) => write!(f, "{binary}"),
            Suffix::Decimal(decimal) => write!(f, "{decimal}"),
            Suffix::Exponent(exponent) => write!(f, "e{exponent}"),
        }
    }
}

impl Suffix {
    pub fn base(&self) -> usize {
        match self {
            Suffix::Binary(_) => 2,
            Suffix::Decimal(_) | Suffix::Exponent(_) => 10,
        }
    }

    pub fn exponent(&self) -> f64 {
        match self {
            Suffix::Binary(binary) => binary.exponent(),
            Suffix::Decimal(decimal) => decimal.exponent(),
            Suffix::Exponent(exponent) => *exponent,
        }
    }
}

/// Byte-multiples based on powers of 2, `1024^1` (`Ki`) through `1024^6`
/// (`Ei`). Anything bigger is not a valid suffix according to the Kubernetes
/// serialization format.
#[derive(Clone, Copy, Debug, PartialEq, PartialOrd, strum::Display, strum::EnumString)]
pub enum BinaryMultiple {
    #[strum(serialize = "Ki")]
    Kibi,

    #[strum(serialize = "Mi")]
    Mebi,

    #[strum(serialize = "Gi")]
    Gibi,

    #[strum(serialize = "Ti")]
    Tebi,

    #[strum(serialize = "Pi")]
    Pebi,

    #[strum(serialize = "Ei")]
    Exbi,
}

impl BinaryMultiple {
    fn exponent(self) -> f64 {
        match self {
            BinaryMultiple::Kibi => 10.0,
            BinaryMultiple::Mebi => 20.0,
            BinaryMultiple::Gibi => 30.0,
            BinaryMultiple::Tebi => 40.0,
            BinaryMultiple::Pebi => 50.0,
            BinaryMultiple::Exbi => 60.0,
        }
    }
}

/// Byte-multiples based on powers of 10, including the Kubernetes-only
/// milli multiple used for fractional CPUs.
#[derive(Clone, Copy, Debug, PartialEq, PartialOrd, strum::Display, strum::EnumString)]
pub enum DecimalMultiple {
    #[strum(serialize = "m")]
    Milli,

    #[strum(serialize = "k")]
    Kilo,

    #[strum(serialize = "M")]
    Mega,

    #[strum(serialize = "G")]
    Giga,

    #[strum(serialize = "T")]
    Tera,

    #[strum(serialize = "P")]
    Peta,

    #[strum(serialize = "E")]
    Exa,
}

impl DecimalMultiple {
    fn exponent(self) -> f64 {
        match self {
            DecimalMultiple::Milli => -3.0,
            DecimalMultiple::Kilo => 3.0,
            DecimalMultiple::Mega => 6.0,
            DecimalMultiple::Giga => 9.0,
            DecimalMultiple::Tera => 12.0,
            DecimalMultiple::Peta => 15.0,
            DecimalMultiple::Exa => 18.0,
        }
    }
}
