use std::env;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Production => "production",
        }
    }

    pub fn from_env() -> Self {
        match env::var("ENVIRONMENT")
            .unwrap_or_else(|_| "development".to_string())
            .to_lowercase()
            .as_str()
        {
            "production" | "prod" => Environment::Production,
            _ => Environment::Development,
        }
    }
}

/// Read `key` from the environment and parse it, falling back to `default`
/// when the variable is unset or does not parse.
///
/// Booleans additionally accept `1`/`0`, `yes`/`no` and `on`/`off`.
pub fn env_or<T: FromStr>(key: &str, default: T) -> T {
    let Ok(raw) = env::var(key) else {
        return default;
    };
    let raw = raw.trim();

    let normalized = match raw.to_lowercase().as_str() {
        "1" | "yes" | "on" if is_bool::<T>() => "true".to_string(),
        "0" | "no" | "off" if is_bool::<T>() => "false".to_string(),
        other if is_bool::<T>() => other.to_string(),
        _ => raw.to_string(),
    };

    match normalized.parse() {
        Ok(value) => value,
        Err(_) => {
            tracing::warn!(key, value = raw, "Ignoring unparseable environment value");
            default
        }
    }
}

fn is_bool<T>() -> bool {
    std::any::type_name::<T>() == "bool"
}
