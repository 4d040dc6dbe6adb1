use std::process::ExitCode;
use std::str::FromStr;

use counterbucket_core::CounterBucketError;
use serde::Serialize;
use thiserror::Error;

pub const EXIT_SUCCESS: u8 = 0;
pub const EXIT_INPUT_ERROR: u8 = 2;
pub const EXIT_RUNTIME_ERROR: u8 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Json,
    Text,
}

impl OutputFormat {
    /// Best guess used to render the error for an unparseable format.
    pub fn hint(s: &str) -> Self {
        s.parse().unwrap_or(OutputFormat::Text)
    }
}

impl FromStr for OutputFormat {
    type Err = CliError;

    fn from_str(s: &str) -> CliResult<Self> {
        if s.eq_ignore_ascii_case("json") {
            Ok(OutputFormat::Json)
        } else if s.eq_ignore_ascii_case("text") {
            Ok(OutputFormat::Text)
        } else {
            Err(CliError::input(format!(
                "Invalid output_format '{s}'. Expected: json, text"
            )))
        }
    }
}

/// Command failure, split by who has to act on it.
#[derive(Debug, Error)]
pub enum CliError {
    /// Bad flags, unreadable files, malformed directory or readings.
    #[error("{0}")]
    Input(String),
    /// The engine failed while answering; `status` names the failure class.
    #[error("{message}")]
    Runtime {
        message: String,
        status: Option<&'static str>,
    },
}

impl CliError {
    pub fn input(message: impl Into<String>) -> Self {
        CliError::Input(message.into())
    }

    pub fn runtime(message: impl Into<String>) -> Self {
        CliError::Runtime {
            message: message.into(),
            status: None,
        }
    }

    pub fn exit_code(&self) -> u8 {
        match self {
            CliError::Input(_) => EXIT_INPUT_ERROR,
            CliError::Runtime { .. } => EXIT_RUNTIME_ERROR,
        }
    }

    fn status(&self) -> Option<&'static str> {
        match self {
            CliError::Input(_) => None,
            CliError::Runtime { status, .. } => *status,
        }
    }
}

impl From<CounterBucketError> for CliError {
    fn from(err: CounterBucketError) -> Self {
        let status = match &err {
            CounterBucketError::Backend(_) => "backend",
            CounterBucketError::Invariant(_) => "invariant",
            CounterBucketError::Cancelled => "cancelled",
            CounterBucketError::UnsupportedWidth(_)
            | CounterBucketError::InvalidTimezone(_)
            | CounterBucketError::ParseError(_)
            | CounterBucketError::Directory(_) => return CliError::Input(err.to_string()),
        };
        CliError::Runtime {
            message: err.to_string(),
            status: Some(status),
        }
    }
}

pub type CliResult<T> = std::result::Result<T, CliError>;

#[derive(Serialize)]
struct ErrorEnvelope<'a> {
    error: String,
    exit_code: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    status: Option<&'a str>,
}

/// Print `err` to stderr in `output_format` and turn it into the exit code.
pub fn render_error(err: &CliError, output_format: OutputFormat) -> ExitCode {
    let rendered = match output_format {
        OutputFormat::Json => serde_json::to_string_pretty(&ErrorEnvelope {
            error: err.to_string(),
            exit_code: err.exit_code(),
            status: err.status(),
        })
        .ok(),
        OutputFormat::Text => None,
    };
    eprintln!("{}", rendered.unwrap_or_else(|| format!("Error: {err}")));

    ExitCode::from(err.exit_code())
}
