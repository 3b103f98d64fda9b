use std::fmt;

/// Failure taxonomy for launcher operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LauncherError {
    /// Transport or HTTP-status failure talking to the remote.
    Network(String),
    /// Missing or malformed data in a response or a local record.
    Parse(String),
    /// Filesystem or process failure.
    Io(String),
}

impl LauncherError {
    pub fn network(msg: impl Into<String>) -> Self {
        Self::Network(msg.into())
    }

    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }

    pub fn io(msg: impl Into<String>) -> Self {
        Self::Io(msg.into())
    }
}

impl fmt::Display for LauncherError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Network(msg) => write!(f, "network error: {msg}"),
            Self::Parse(msg) => write!(f, "parse error: {msg}"),
            Self::Io(msg) => write!(f, "io error: {msg}"),
        }
    }
}

impl std::error::Error for LauncherError {}

impl From<std::io::Error> for LauncherError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn displays_with_category_prefix() {
        assert_eq!(
            LauncherError::network("timed out").to_string(),
            "network error: timed out"
        );
        assert_eq!(
            LauncherError::parse("no commits").to_string(),
            "parse error: no commits"
        );
        assert_eq!(
            LauncherError::io("denied").to_string(),
            "io error: denied"
        );
    }

    #[test]
    fn converts_io_errors() {
        let err = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        assert!(matches!(LauncherError::from(err), LauncherError::Io(_)));
    }
}
