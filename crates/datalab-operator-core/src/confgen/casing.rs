//! Key spelling for rendered configuration files.

/// Keys whose product spelling differs from what [`config_key`]'s generic
/// conversion would produce. Table-driven so the rule and its exceptions can
/// be tested (and extended) independently of each other.
const KEY_OVERRIDES: &[(&str, &str)] = &[
    ("AuthPAMSessionsEnabled", "auth-pam-sessions-enabled"),
    ("MaxCPUs", "max-cpus"),
    ("RSessionPath", "rsession-path"),
    ("WWWAddress", "www-address"),
    ("WWWPort", "www-port"),
];

/// Converts a declared field identifier into its rendered key name.
///
/// The generic rule inserts a `-` before every internal uppercase character
/// and lowercases the result (`ServerUser` becomes `server-user`). Keys the
/// products spell differently are looked up in [`KEY_OVERRIDES`] first.
pub fn config_key(ident: &str) -> String {
    if let Some((_, spelled)) = KEY_OVERRIDES.iter().find(|(from, _)| *from == ident) {
        return (*spelled).to_owned();
    }

    let mut key = String::with_capacity(ident.len() + 4);
    for (index, c) in ident.chars().enumerate() {
        if c.is_ascii_uppercase() {
            if index > 0 {
                key.push('-');
            }
            key.push(c.to_ascii_lowercase());
        } else {
            key.push(c);
        }
    }

    key
}

#[cfg(test)]
mod test {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("Address", "address")]
    #[case("ServerUser", "server-user")]
    #[case("JobExpiryHours", "job-expiry-hours")]
    #[case("Enabled", "enabled")]
    #[case("port", "port")]
    fn generic_rule(#[case] ident: &str, #[case] expected: &str) {
        assert_eq!(config_key(ident), expected);
    }

    #[rstest]
    #[case("WWWPort", "www-port")]
    #[case("WWWAddress", "www-address")]
    #[case("AuthPAMSessionsEnabled", "auth-pam-sessions-enabled")]
    #[case("RSessionPath", "rsession-path")]
    #[case("MaxCPUs", "max-cpus")]
    fn overrides_win(#[case] ident: &str, #[case] expected: &str) {
        assert_eq!(config_key(ident), expected);
    }

    #[test]
    fn override_table_only_contains_exceptions() {
        for (ident, spelled) in KEY_OVERRIDES {
            assert_ne!(
                &config_key_without_overrides(ident),
                spelled,
                "{ident} does not need an override entry"
            );
        }
    }

    fn config_key_without_overrides(ident: &str) -> String {
        let mut key = String::new();
        for (index, c) in ident.chars().enumerate() {
            if c.is_ascii_uppercase() {
                if index > 0 {
                    key.push('-');
                }
                key.push(c.to_ascii_lowercase());
            } else {
                key.push(c);
            }
        }
        key
    }
}
