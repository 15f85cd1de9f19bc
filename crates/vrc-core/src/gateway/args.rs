//! Positional OSC argument decoding helpers.

use rosc::OscType;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ArgError {
    #[error("{address} expects {expected} arguments, got {got}")]
    Arity {
        address: String,
        expected: usize,
        got: usize,
    },
    #[error("argument {index} ({name}) must be {expected}, got {got}")]
    Type {
        index: usize,
        name: &'static str,
        expected: &'static str,
        got: String,
    },
}

/// Fails unless exactly `expected` arguments were sent.
pub fn expect_arity(address: &str, args: &[OscType], expected: usize) -> Result<(), ArgError> {
    if args.len() == expected {
        Ok(())
    } else {
        Err(ArgError::Arity {
            address: address.to_string(),
            expected,
            got: args.len(),
        })
    }
}

/// Strict string argument.
pub fn string_arg<'a>(args: &'a [OscType], index: usize, name: &'static str) -> Result<&'a str, ArgError> {
    match args.get(index) {
        Some(OscType::String(s)) => Ok(s.as_str()),
        other => Err(type_error(index, name, "a string", other)),
    }
}

/// Identifier-like argument: strings pass through, scalars are rendered as text.
pub fn text_arg(args: &[OscType], index: usize, name: &'static str) -> Result<String, ArgError> {
    match args.get(index) {
        Some(OscType::String(s)) => Ok(s.clone()),
        Some(OscType::Int(v)) => Ok(v.to_string()),
        Some(OscType::Long(v)) => Ok(v.to_string()),
        Some(OscType::Float(v)) => Ok(v.to_string()),
        Some(OscType::Double(v)) => Ok(v.to_string()),
        Some(OscType::Bool(v)) => Ok(v.to_string()),
        other => Err(type_error(index, name, "a string or scalar", other)),
    }
}

fn type_error(index: usize, name: &'static str, expected: &'static str, got: Option<&OscType>) -> ArgError {
    ArgError::Type {
        index,
        name,
        expected,
        got: got.map_or_else(|| "nothing".to_string(), |v| format!("{v:?}")),
    }
}
