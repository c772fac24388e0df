use std::env;

/// Deployment environment, selected through the `ENV` variable.
#[derive(Debug, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    #[must_use]
    pub fn from_env_var() -> Self {
        match env::var("ENV") {
            Ok(val) => Self::parse(&val),
            Err(_) => Environment::Development,
        }
    }

    fn parse(val: &str) -> Self {
        match val.to_lowercase().as_str() {
            "production" | "prod" => Environment::Production,
            _ => Environment::Development,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Production => "production",
        }
    }
}
