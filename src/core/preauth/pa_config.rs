use std::collections::BTreeMap;

/// Small values that the mechanisms persist in the vault between
/// exchanges with the same server. Stored as `key=value` lines.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PaConfig {
    values: BTreeMap<String, String>,
}

impl PaConfig {
    pub fn new() -> Self {
        return Self::default();
    }

    pub fn parse(raw: &str) -> Self {
        let mut config = Self::new();
        for line in raw.lines() {
            if let Some(pos) = line.find('=') {
                config.set(&line[..pos], &line[pos + 1..]);
            }
        }
        return config;
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        return self.values.get(key).map(|v| v.as_str());
    }

    pub fn set(&mut self, key: &str, value: &str) {
        self.values.insert(key.to_string(), value.to_string());
    }

    pub fn is_empty(&self) -> bool {
        return self.values.is_empty();
    }

    pub fn to_raw(&self) -> String {
        return self
            .values
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<String>>()
            .join("\n");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_raw() {
        let mut config = PaConfig::new();
        config.set("sam2_track", "abc=1");
        config.set("otp", "x");

        let parsed = PaConfig::parse(&config.to_raw());
        assert_eq!(config, parsed);
        assert_eq!(Some("abc=1"), parsed.get("sam2_track"));
    }
}
