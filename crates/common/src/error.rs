//! Configuration-time errors shared by the relay crates

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_display() {
        let err = Error::Config("groq.timeout_secs must be greater than 0".into());
        assert_eq!(
            err.to_string(),
            "Configuration error: groq.timeout_secs must be greater than 0"
        );
    }

    #[test]
    fn io_error_converts_with_prefix() {
        let err: Error =
            std::io::Error::new(std::io::ErrorKind::NotFound, "groq-relay.toml").into();
        assert!(err.to_string().starts_with("I/O error:"), "got: {err}");
    }

    #[test]
    fn toml_error_converts() {
        let parse = toml::from_str::<toml::Table>("not = valid = toml").unwrap_err();
        let err: Error = parse.into();
        assert!(matches!(err, Error::Toml(_)));
    }
}
