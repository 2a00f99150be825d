use thiserror::Error;

/// Status report errors, the request is rejected as a whole.
///
#[derive(Debug, Error, PartialEq)]
pub enum RosterError {
    #[error("Missing required field {0}")]
    MissingField(&'static str),
    #[error("Invalid status {0}")]
    InvalidStatus(String),
}

/// Weather errors, only the current request fails.
///
#[derive(Debug, Error, PartialEq)]
pub enum WeatherError {
    #[error("Can not decode METAR: {0}")]
    Decode(String),
    #[error("Unparsed groups in body: {0}")]
    UnparsedGroups(String),
    #[error("No METAR available for {0}")]
    EmptyReport(String),
    #[error("METAR provider unavailable: {0}")]
    FetchUnavailable(String),
}

impl WeatherError {
    /// Whether the failure came from the fetch collaborator rather than the decoder.
    ///
    pub fn is_fetch(&self) -> bool {
        matches!(
            self,
            WeatherError::EmptyReport(_) | WeatherError::FetchUnavailable(_)
        )
    }
}
