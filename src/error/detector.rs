//! Keyword detector used as the last classification stage.
//!
//! Only consulted once every structured signal (tagged [`super::DomainError`]s,
//! OS error codes, timeouts) has been ruled out. Patterns are matched against
//! the lowercased error text, in priority order.

use regex::Regex;

use super::ErrorKind;

/// Phrases that indicate a command or binary is absent.
const ABSENCE_MARKERS: &str =
    r"(command not found|not found|not installed|enoent|not recognized|no such file)";

/// A pattern for matching errors in text output.
#[derive(Debug)]
pub struct ErrorPattern {
    regex: Regex,
    kind: ErrorKind,
    description: String,
}

impl ErrorPattern {
    /// Creates a new error pattern.
    ///
    /// # Panics
    /// Panics if the regex pattern is invalid.
    pub fn new(pattern: &str, kind: ErrorKind, description: impl Into<String>) -> Self {
        Self {
            regex: Regex::new(pattern).expect("Invalid regex pattern"),
            kind,
            description: description.into(),
        }
    }

    /// Creates a pattern that matches when `tool` is mentioned next to an
    /// absence marker such as "command not found", in either order.
    pub fn tool_absent(tool: &str, kind: ErrorKind) -> Self {
        let tool = format!(r"\b{}\b", tool);
        let pattern = format!(
            "{tool}.*{markers}|{markers}.*{tool}",
            tool = tool,
            markers = ABSENCE_MARKERS
        );
        Self::new(&pattern, kind, format!("{} missing", kind.as_str()))
    }

    /// Returns the error kind assigned on match.
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Returns the description.
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Checks if this pattern matches the given (already lowercased) text.
    pub fn matches(&self, text: &str) -> bool {
        self.regex.is_match(text)
    }
}

/// Ordered list of keyword patterns.
#[derive(Debug)]
pub struct ErrorDetector {
    patterns: Vec<ErrorPattern>,
}

impl Default for ErrorDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl ErrorDetector {
    /// Creates a detector with the built-in patterns.
    pub fn new() -> Self {
        Self {
            patterns: Self::default_patterns(),
        }
    }

    fn default_patterns() -> Vec<ErrorPattern> {
        vec![
            // npm reports its own failures with an `npm ERR!` prefix
            ErrorPattern::new(
                r"npm err!|npm error",
                ErrorKind::DependencyInstallFailed,
                "npm install failure",
            ),
            ErrorPattern::new(
                r"eai_again|enotfound|getaddrinfo|failed to lookup address|name or service not known|could not resolve host",
                ErrorKind::DnsResolutionFailed,
                "DNS resolution failure",
            ),
            ErrorPattern::new(
                r"etimedout|timed out|\btimeout\b",
                ErrorKind::NetworkTimeout,
                "Network timeout",
            ),
            ErrorPattern::new(
                r"econnrefused|econnreset|network is unreachable|enetunreach",
                ErrorKind::NetworkUnavailable,
                "Network unavailable",
            ),
            ErrorPattern::new(
                r"\b(e404|404 not found|etarget)\b",
                ErrorKind::PackageDownloadFailed,
                "Package not found in registry",
            ),
            ErrorPattern::tool_absent("docker", ErrorKind::DockerNotFound),
            ErrorPattern::tool_absent("pip3?", ErrorKind::PipNotFound),
            ErrorPattern::tool_absent("python3?", ErrorKind::PythonNotFound),
            ErrorPattern::tool_absent("npm", ErrorKind::NpmNotFound),
            ErrorPattern::tool_absent("node(js)?", ErrorKind::NodeNotFound),
            ErrorPattern::tool_absent("git", ErrorKind::GitNotFound),
        ]
    }

    /// Classifies free-form error text, returning the first matching kind.
    pub fn classify_message(&self, text: &str) -> Option<ErrorKind> {
        let lowered = text.to_lowercase();
        self.patterns
            .iter()
            .find(|pattern| pattern.matches(&lowered))
            .map(|pattern| {
                tracing::debug!(pattern = pattern.description(), "classified by keyword");
                pattern.kind()
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detect(text: &str) -> Option<ErrorKind> {
        ErrorDetector::new().classify_message(text)
    }

    #[test]
    fn test_tool_absence_either_order() {
        assert_eq!(detect("docker: command not found"), Some(ErrorKind::DockerNotFound));
        assert_eq!(detect("command not found: docker"), Some(ErrorKind::DockerNotFound));
        assert_eq!(
            detect("'git' is not recognized as an internal or external command"),
            Some(ErrorKind::GitNotFound)
        );
    }

    #[test]
    fn test_tool_mention_alone_is_not_absence() {
        assert_eq!(detect("docker compose build finished with warnings"), None);
    }

    #[test]
    fn test_node_modules_is_not_node() {
        assert_eq!(detect("cannot remove node_modules: not found"), None);
    }

    #[test]
    fn test_npm_err_prefix() {
        assert_eq!(
            detect("npm ERR! code ERESOLVE unable to resolve dependency tree"),
            Some(ErrorKind::DependencyInstallFailed)
        );
    }

    #[test]
    fn test_network_phrases() {
        assert_eq!(detect("getaddrinfo ENOTFOUND registry.npmjs.org"), Some(ErrorKind::DnsResolutionFailed));
        assert_eq!(detect("connect ETIMEDOUT 104.16.0.35:443"), Some(ErrorKind::NetworkTimeout));
        assert_eq!(detect("connect ECONNREFUSED 127.0.0.1:5432"), Some(ErrorKind::NetworkUnavailable));
    }

    #[test]
    fn test_case_insensitive() {
        assert_eq!(detect("PYTHON3: COMMAND NOT FOUND"), Some(ErrorKind::PythonNotFound));
    }

    #[test]
    fn test_no_match() {
        assert_eq!(detect("something odd happened"), None);
    }

    #[test]
    fn test_pattern_accessors() {
        let pattern = ErrorPattern::tool_absent("docker", ErrorKind::DockerNotFound);
        assert_eq!(pattern.kind(), ErrorKind::DockerNotFound);
        assert_eq!(pattern.description(), "docker_not_found missing");
    }
}
