use std::{fmt, ops::Deref, path::PathBuf};

/// Where a configuration value came from, highest precedence first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PropertySource {
    Cli,
    Env,
    File,
    Stored,
    Default,
}

impl fmt::Display for PropertySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PropertySource::Cli => "cli",
            PropertySource::Env => "env",
            PropertySource::File => "file",
            PropertySource::Stored => "stored",
            PropertySource::Default => "default",
        };
        f.write_str(name)
    }
}

/// A configuration property that tracks its source and original value
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedProperty<T> {
    /// Value from command line arguments (parsed_value, flag name)
    Cli(T, String),
    /// Value from environment variable (parsed_value, variable name)
    Env(T, String),
    /// Value from configuration file (parsed_value, file path, toml key)
    File(T, PathBuf, String),
    /// Value remembered in the preference store by `login`
    Stored(T),
    /// Default value when no other source provided
    Default(T),
}

impl<T> ParsedProperty<T> {
    /// Get the parsed value
    pub fn value(&self) -> &T {
        match self {
            ParsedProperty::Cli(value, _)
            | ParsedProperty::Env(value, _)
            | ParsedProperty::File(value, _, _)
            | ParsedProperty::Stored(value)
            | ParsedProperty::Default(value) => value,
        }
    }

    pub fn into_value(self) -> T {
        match self {
            ParsedProperty::Cli(value, _)
            | ParsedProperty::Env(value, _)
            | ParsedProperty::File(value, _, _)
            | ParsedProperty::Stored(value)
            | ParsedProperty::Default(value) => value,
        }
    }

    pub fn source(&self) -> PropertySource {
        match self {
            ParsedProperty::Cli(..) => PropertySource::Cli,
            ParsedProperty::Env(..) => PropertySource::Env,
            ParsedProperty::File(..) => PropertySource::File,
            ParsedProperty::Stored(_) => PropertySource::Stored,
            ParsedProperty::Default(_) => PropertySource::Default,
        }
    }

    /// Human-readable origin, e.g. `env (ADO_MOBILE_PAT)` or `file (/path/config.toml)`.
    pub fn describe_source(&self) -> String {
        match self {
            ParsedProperty::Cli(_, flag) => format!("cli ({})", flag),
            ParsedProperty::Env(_, var) => format!("env ({})", var),
            ParsedProperty::File(_, path, _) => format!("file ({})", path.display()),
            ParsedProperty::Stored(_) => "stored (ado-mobile login)".to_string(),
            ParsedProperty::Default(_) => "default".to_string(),
        }
    }

    /// Transforms the value, keeping the source.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> ParsedProperty<U> {
        match self {
            ParsedProperty::Cli(value, flag) => ParsedProperty::Cli(f(value), flag),
            ParsedProperty::Env(value, var) => ParsedProperty::Env(f(value), var),
            ParsedProperty::File(value, path, key) => ParsedProperty::File(f(value), path, key),
            ParsedProperty::Stored(value) => ParsedProperty::Stored(f(value)),
            ParsedProperty::Default(value) => ParsedProperty::Default(f(value)),
        }
    }
}

impl<T> Deref for ParsedProperty<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        self.value()
    }
}

impl<T: fmt::Display> fmt::Display for ParsedProperty<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.value().fmt(f)
    }
}

impl<T> From<T> for ParsedProperty<T> {
    fn from(value: T) -> Self {
        ParsedProperty::Default(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// # ParsedProperty Value Access
    ///
    /// Tests accessing the value from every source variant.
    ///
    /// ## Test Scenario
    /// - One property per source holding the same organization
    ///
    /// ## Expected Outcome
    /// - value(), Deref and into_value agree
    #[test]
    fn test_parsed_property_value_access() {
        let props = vec![
            ParsedProperty::Cli("contoso".to_string(), "--organization".to_string()),
            ParsedProperty::Env("contoso".to_string(), "ADO_MOBILE_ORGANIZATION".to_string()),
            ParsedProperty::File(
                "contoso".to_string(),
                PathBuf::from("/cfg/config.toml"),
                "organization".to_string(),
            ),
            ParsedProperty::Stored("contoso".to_string()),
            ParsedProperty::Default("contoso".to_string()),
        ];

        for prop in props {
            assert_eq!(prop.value(), "contoso");
            assert_eq!(&*prop, "contoso");
            assert_eq!(prop.into_value(), "contoso");
        }
    }

    /// # ParsedProperty Source Tracking
    ///
    /// Tests source identification and descriptions.
    ///
    /// ## Test Scenario
    /// - Properties from env, file and the preference store
    ///
    /// ## Expected Outcome
    /// - source() and describe_source() name the origin
    #[test]
    fn test_parsed_property_source_tracking() {
        let env = ParsedProperty::Env(1, "ADO_MOBILE_PAT".to_string());
        assert_eq!(env.source(), PropertySource::Env);
        assert_eq!(env.describe_source(), "env (ADO_MOBILE_PAT)");

        let file = ParsedProperty::File(1, PathBuf::from("/cfg/config.toml"), "pat".to_string());
        assert_eq!(file.describe_source(), "file (/cfg/config.toml)");

        let stored = ParsedProperty::Stored(1);
        assert_eq!(stored.source().to_string(), "stored");
        assert!(PropertySource::Cli < PropertySource::Stored);
    }

    /// # Map Keeps Source
    ///
    /// Tests that transforming a value preserves where it came from.
    ///
    /// ## Test Scenario
    /// - Map a CLI string property to its length
    ///
    /// ## Expected Outcome
    /// - Value transformed, flag retained
    #[test]
    fn test_map_keeps_source() {
        let prop = ParsedProperty::Cli("json".to_string(), "--format".to_string());
        let mapped = prop.map(|s| s.len());
        assert_eq!(mapped, ParsedProperty::Cli(4, "--format".to_string()));
    }

    #[test]
    fn test_from_is_default() {
        let prop: ParsedProperty<u8> = 3.into();
        assert_eq!(prop.source(), PropertySource::Default);
        assert_eq!(prop.to_string(), "3");
    }
}
