//! Selector error types.

/// Errors returned by selector control operations.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SelectorError {
    /// No registered station lies within the service radius
    #[error("no station found within range of ({latitude}, {longitude})")]
    NoStationFound { latitude: f64, longitude: f64 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = SelectorError::NoStationFound {
            latitude: 46.5,
            longitude: 0.54,
        };
        assert_eq!(
            err.to_string(),
            "no station found within range of (46.5, 0.54)"
        );
    }
}
