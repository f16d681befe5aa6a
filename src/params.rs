use std::{collections::BTreeMap, fmt, str::FromStr};

/// Flat `key:value,key:value` parameter list describing one input binding.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParamPackage {
    entries: BTreeMap<String, String>,
}

impl ParamPackage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: &str, value: impl ToString) -> Self {
        self.set(key, value);
        self
    }

    pub fn set(&mut self, key: &str, value: impl ToString) {
        self.entries.insert(key.to_owned(), value.to_string());
    }

    pub fn has(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Parsed value for `key`, or `default` when missing or unparsable.
    pub fn get<T: FromStr>(&self, key: &str, default: T) -> T {
        self.get_str(key)
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(default)
    }
}

impl FromStr for ParamPackage {
    type Err = std::convert::Infallible;

    /// Segments without a `:` are skipped.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let entries = s
            .split(',')
            .filter_map(|pair| pair.split_once(':'))
            .map(|(k, v)| (k.trim().to_owned(), v.trim().to_owned()))
            .filter(|(k, _)| !k.is_empty())
            .collect();
        Ok(Self { entries })
    }
}

impl fmt::Display for ParamPackage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (k, v)) in self.entries.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{k}:{v}")?;
        }
        Ok(())
    }
}
