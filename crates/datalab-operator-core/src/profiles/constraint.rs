//! Placement constraint tokens.

use std::{
    fmt::{self, Display},
    str::FromStr,
};

use snafu::{Snafu, ensure};
use tracing::warn;

#[derive(Debug, PartialEq, Snafu)]
pub enum ParseConstraintError {
    #[snafu(display("constraint token {token:?} has no key/value separator"))]
    MissingSeparator { token: String },

    #[snafu(display("constraint token {token:?} has more than one separator"))]
    MultipleSeparators { token: String },

    #[snafu(display("constraint token {token:?} has an empty key or value"))]
    EmptyKeyOrValue { token: String },

    #[snafu(display("constraint token {token:?} contains whitespace"))]
    EmbeddedWhitespace { token: String },
}

/// Separator between the key and value of a placement constraint.
///
/// The launcher treats `=` and `:` tokens differently, so the separator is
/// semantic and carried through to the rendered profile text.
#[derive(Clone, Copy, Debug, Eq, PartialEq, strum::Display, strum::EnumString)]
pub enum Separator {
    #[strum(serialize = "=")]
    Equals,

    #[strum(serialize = ":")]
    Colon,
}

/// A validated scheduling hint restricting where a workload may run.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PlacementConstraint {
    pub key: String,
    pub value: String,
    pub separator: Separator,
}

impl FromStr for PlacementConstraint {
    type Err = ParseConstraintError;

    fn from_str(token: &str) -> Result<Self, Self::Err> {
        ensure!(
            !token.chars().any(char::is_whitespace),
            EmbeddedWhitespaceSnafu { token }
        );

        let separator_count = token.matches(['=', ':']).count();
        ensure!(separator_count > 0, MissingSeparatorSnafu { token });
        ensure!(separator_count < 2, MultipleSeparatorsSnafu { token });

        let Some((index, separator_char)) = token
            .char_indices()
            .find(|(_, c)| *c == '=' || *c == ':')
        else {
            return MissingSeparatorSnafu { token }.fail();
        };

        let separator = match separator_char {
            '=' => Separator::Equals,
            _ => Separator::Colon,
        };

        let key = &token[..index];
        let value = &token[index + 1..];
        ensure!(
            !key.is_empty() && !value.is_empty(),
            EmptyKeyOrValueSnafu { token }
        );

        Ok(Self {
            key: key.to_owned(),
            value: value.to_owned(),
            separator,
        })
    }
}

impl Display for PlacementConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{key}{separator}{value}",
            key = self.key,
            separator = self.separator,
            value = self.value
        )
    }
}

impl serde::Serialize for PlacementConstraint {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> serde::Deserialize<'de> for PlacementConstraint {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let token = <String as serde::Deserialize>::deserialize(deserializer)?;
        token.parse().map_err(serde::de::Error::custom)
    }
}

impl schemars::JsonSchema for PlacementConstraint {
    fn schema_name() -> std::borrow::Cow<'static, str> {
        std::borrow::Cow::Borrowed("PlacementConstraint")
    }

    fn json_schema(_generator: &mut schemars::SchemaGenerator) -> schemars::Schema {
        schemars::json_schema!({
            "type": "string",
            "description": "A key=value or key:value placement constraint token",
        })
    }
}

/// Parses a comma-separated constraint string. Malformed tokens are dropped
/// with a warning and never abort rendering; empty input yields an empty
/// list.
pub fn parse_constraint_list(input: &str) -> Vec<PlacementConstraint> {
    input
        .split(',')
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .filter_map(|token| match PlacementConstraint::from_str(token) {
            Ok(constraint) => Some(constraint),
            Err(error) => {
                warn!(%error, token, "dropping malformed placement constraint");
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod test {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("node-type=gpu", "node-type", "gpu", Separator::Equals)]
    #[case("node-type:gpu", "node-type", "gpu", Separator::Colon)]
    #[case("zone=us-east-1a", "zone", "us-east-1a", Separator::Equals)]
    fn valid_tokens(
        #[case] token: &str,
        #[case] key: &str,
        #[case] value: &str,
        #[case] separator: Separator,
    ) {
        let constraint = PlacementConstraint::from_str(token).unwrap();
        assert_eq!(constraint.key, key);
        assert_eq!(constraint.value, value);
        assert_eq!(constraint.separator, separator);
        assert_eq!(constraint.to_string(), token);
    }

    #[rstest]
    #[case("=gpu")]
    #[case("node-type=")]
    #[case("node type=gpu")]
    #[case("a=b=c")]
    #[case("a=b:c")]
    #[case("gpu")]
    fn invalid_tokens(#[case] token: &str) {
        assert!(PlacementConstraint::from_str(token).is_err());
    }

    #[test]
    fn list_parsing_drops_invalid_tokens() {
        let constraints = parse_constraint_list("node-type=gpu, =bad, zone:us-east-1a,,");
        let rendered: Vec<_> = constraints.iter().map(ToString::to_string).collect();
        assert_eq!(rendered, ["node-type=gpu", "zone:us-east-1a"]);
    }

    #[test]
    fn empty_input_yields_empty_list() {
        assert!(parse_constraint_list("").is_empty());
    }
}
