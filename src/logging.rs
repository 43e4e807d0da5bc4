use tracing_subscriber::EnvFilter;

/// Level implied by the `-v`/`-q` counts, or `None` when neither was given.
pub fn level(verbose: u8, quiet: u8) -> Option<&'static str> {
    match (verbose, quiet) {
        (0, 0) => None,
        (0, 1) => Some("warn"),
        (0, _) => Some("error"),
        (1, _) => Some("debug"),
        _ => Some("trace"),
    }
}

/// Install the global subscriber. Logs go to stderr; stdout is reserved for
/// command output.
///
/// `RUST_LOG` is honoured unless `-v` or `-q` was given.
pub fn init(verbose: u8, quiet: u8) {
    let filter = match level(verbose, quiet) {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(0, 0, None)]
    #[case(1, 0, Some("debug"))]
    #[case(3, 0, Some("trace"))]
    #[case(0, 1, Some("warn"))]
    #[case(0, 2, Some("error"))]
    fn test_level(#[case] verbose: u8, #[case] quiet: u8, #[case] expected: Option<&str>) {
        assert_eq!(level(verbose, quiet), expected);
    }
}
