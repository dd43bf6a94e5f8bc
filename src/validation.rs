//! Input validation for project configuration values.
//!
//! Validators are pure: they never touch the filesystem or network and
//! return their verdict as a value instead of failing.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::error::{DomainError, ErrorKind};
use crate::project::ProjectConfig;

/// Longest accepted project name.
pub const MAX_PROJECT_NAME_LEN: usize = 50;

/// Shortest password accepted without complaint.
pub const MIN_PASSWORD_LEN: usize = 8;

/// Names that clash with tooling, build output or reserved device names.
pub const RESERVED_PROJECT_NAMES: &[&str] = &[
    "node_modules",
    "favicon.ico",
    "src",
    "dist",
    "build",
    "public",
    "test",
    "tests",
    "backend",
    "frontend",
    "con",
    "prn",
    "aux",
    "nul",
    "com1",
    "lpt1",
];

/// Ports that typically belong to other services.
pub const WELL_KNOWN_PORTS: &[(u16, &str)] = &[
    (21, "FTP"),
    (22, "SSH"),
    (23, "Telnet"),
    (25, "SMTP"),
    (53, "DNS"),
    (80, "HTTP"),
    (110, "POP3"),
    (143, "IMAP"),
    (443, "HTTPS"),
    (3306, "MySQL"),
    (5432, "PostgreSQL"),
    (6379, "Redis"),
    (27017, "MongoDB"),
];

/// Outcome of validating one value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "message", rename_all = "snake_case")]
pub enum Validation {
    /// The value is acceptable.
    Valid,
    /// The value is acceptable but probably not what the user wants.
    Warning(String),
    /// The value must be changed.
    Invalid(String),
}

impl Validation {
    fn invalid(message: impl Into<String>) -> Self {
        Validation::Invalid(message.into())
    }

    /// True unless the value was rejected.
    pub fn is_accepted(&self) -> bool {
        !matches!(self, Validation::Invalid(_))
    }

    /// The warning or violation text.
    pub fn message(&self) -> Option<&str> {
        match self {
            Validation::Valid => None,
            Validation::Warning(message) | Validation::Invalid(message) => Some(message),
        }
    }

    /// Converts a rejection into a [`DomainError`] for `field`.
    ///
    /// Accepted values yield their warning, if any.
    pub fn into_result(self, field: Field, value: &str) -> Result<Option<String>, DomainError> {
        match self {
            Validation::Valid => Ok(None),
            Validation::Warning(message) => Ok(Some(message)),
            Validation::Invalid(message) => {
                let error = DomainError::new(field.error_kind(), message)
                    .with_detail("field", field.as_str());
                // Never echo secrets into errors or logs.
                let error = if field == Field::DbPassword {
                    error
                } else {
                    error.with_detail("value", value)
                };
                Err(error)
            }
        }
    }
}

/// Options that change validator strictness.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidationOptions {
    /// Reject passwords shorter than [`MIN_PASSWORD_LEN`] instead of warning.
    pub strict_passwords: bool,
}

impl Default for ValidationOptions {
    fn default() -> Self {
        Self {
            strict_passwords: true,
        }
    }
}

/// A validated configuration field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Field {
    ProjectName,
    Port,
    DbName,
    DbUser,
    DbPassword,
}

impl Field {
    pub fn as_str(self) -> &'static str {
        match self {
            Field::ProjectName => "project-name",
            Field::Port => "port",
            Field::DbName => "db-name",
            Field::DbUser => "db-user",
            Field::DbPassword => "db-password",
        }
    }

    /// The error kind reported when this field is rejected.
    pub fn error_kind(self) -> ErrorKind {
        match self {
            Field::ProjectName => ErrorKind::InvalidProjectName,
            Field::Port => ErrorKind::InvalidPort,
            Field::DbName => ErrorKind::InvalidDatabaseName,
            Field::DbUser | Field::DbPassword => ErrorKind::InvalidCredentials,
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Field {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.replace('_', "-").as_str() {
            "project-name" | "name" => Ok(Field::ProjectName),
            "port" => Ok(Field::Port),
            "db-name" => Ok(Field::DbName),
            "db-user" => Ok(Field::DbUser),
            "db-password" | "password" => Ok(Field::DbPassword),
            other => Err(format!("unknown field '{}'", other)),
        }
    }
}

/// Validates `value` for `field` with default (strict) options.
pub fn validate(field: Field, value: &str) -> Validation {
    validate_with(field, value, ValidationOptions::default())
}

/// Validates `value` for `field`.
pub fn validate_with(field: Field, value: &str, options: ValidationOptions) -> Validation {
    match field {
        Field::ProjectName => validate_project_name(value),
        Field::Port => validate_port(value),
        Field::DbName => validate_db_name(value),
        Field::DbUser => validate_db_user(value),
        Field::DbPassword => validate_db_password(value, options.strict_passwords),
    }
}

/// Checks the raw value; surrounding whitespace is rejected, not trimmed.
pub fn validate_project_name(name: &str) -> Validation {
    if name.is_empty() {
        return Validation::invalid("Project name is required");
    }
    if RESERVED_PROJECT_NAMES.contains(&name.to_ascii_lowercase().as_str()) {
        return Validation::invalid(format!("'{}' is a reserved name", name));
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
    {
        return Validation::invalid(
            "Project name may only contain lowercase letters, numbers and hyphens",
        );
    }
    if name.starts_with('-') || name.ends_with('-') {
        return Validation::invalid("Project name cannot start or end with a hyphen");
    }
    if name.contains("--") {
        return Validation::invalid("Project name cannot contain consecutive hyphens");
    }
    if name.len() > MAX_PROJECT_NAME_LEN {
        return Validation::invalid(format!(
            "Project name must be at most {} characters",
            MAX_PROJECT_NAME_LEN
        ));
    }
    Validation::Valid
}

pub fn validate_port(value: &str) -> Validation {
    if value.is_empty() || !value.chars().all(|c| c.is_ascii_digit()) {
        return Validation::invalid("Port must be a whole number");
    }
    let port = match value.parse::<u32>() {
        Ok(port) if (1..=65535).contains(&port) => port,
        _ => return Validation::invalid("Port must be between 1 and 65535"),
    };
    if let Some((_, service)) = WELL_KNOWN_PORTS.iter().find(|(p, _)| u32::from(*p) == port) {
        return Validation::Warning(format!(
            "Port {} is commonly used by {}; make sure it is free",
            port, service
        ));
    }
    Validation::Valid
}

pub fn validate_db_name(name: &str) -> Validation {
    if name.is_empty() {
        return Validation::invalid("Database name is required");
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
    {
        return Validation::invalid(
            "Database name may only contain lowercase letters, numbers and underscores",
        );
    }
    if name.starts_with('_') || name.ends_with('_') {
        return Validation::invalid("Database name cannot start or end with an underscore");
    }
    Validation::Valid
}

pub fn validate_db_user(user: &str) -> Validation {
    if user.is_empty() {
        return Validation::invalid("Database user is required");
    }
    if !user.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Validation::invalid(
            "Database user may only contain letters, numbers and underscores",
        );
    }
    Validation::Valid
}

/// Short passwords are rejected when `strict`, otherwise only flagged.
pub fn validate_db_password(value: &str, strict: bool) -> Validation {
    if value.is_empty() {
        return Validation::invalid("Database password is required");
    }
    if value.chars().count() < MIN_PASSWORD_LEN {
        let message = format!(
            "Password should be at least {} characters",
            MIN_PASSWORD_LEN
        );
        return if strict {
            Validation::Invalid(message)
        } else {
            Validation::Warning(message)
        };
    }
    Validation::Valid
}

/// A non-`Valid` verdict for one field of a [`ProjectConfig`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldIssue {
    pub field: Field,
    /// Which config entry the issue refers to, e.g. `api_port`.
    pub key: &'static str,
    pub validation: Validation,
}

/// Validates every field of `config`, plus the rule that the API and
/// frontend ports differ.
pub fn validate_config(config: &ProjectConfig, options: ValidationOptions) -> Vec<FieldIssue> {
    let checks = [
        (Field::ProjectName, "name", config.name.as_str()),
        (Field::DbName, "db_name", config.db_name.as_str()),
        (Field::DbUser, "db_user", config.db_user.as_str()),
        (Field::DbPassword, "db_password", config.db_password.as_str()),
        (Field::Port, "api_port", config.api_port.as_str()),
        (Field::Port, "frontend_port", config.frontend_port.as_str()),
    ];

    let mut issues: Vec<FieldIssue> = checks
        .into_iter()
        .map(|(field, key, value)| FieldIssue {
            field,
            key,
            validation: validate_with(field, value, options),
        })
        .filter(|issue| issue.validation != Validation::Valid)
        .collect();

    if let (Some(api), Some(frontend)) = (config.api_port_number(), config.frontend_port_number()) {
        if api == frontend {
            issues.push(FieldIssue {
                field: Field::Port,
                key: "frontend_port",
                validation: Validation::invalid(format!(
                    "Frontend port must differ from the API port ({})",
                    api
                )),
            });
        }
    }

    issues
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_project_name_table() {
        let cases: &[(&str, bool)] = &[
            ("my-app", true),
            ("app2", true),
            ("a", true),
            ("", false),
            ("   ", false),
            ("-bad", false),
            ("bad-", false),
            ("a--b", false),
            ("My-App", false),
            ("my_app", false),
            ("my app", false),
            ("node_modules", false),
            ("dist", false),
            (" my-app", false),
            ("my-app\n", false),
            ("my-app ", false),
        ];
        for (input, accepted) in cases {
            assert_eq!(
                validate_project_name(input).is_accepted(),
                *accepted,
                "input: {:?}",
                input
            );
        }
    }

    #[test]
    fn test_project_name_messages() {
        assert_eq!(
            validate_project_name("-bad").message(),
            Some("Project name cannot start or end with a hyphen")
        );
        assert!(validate_project_name("node_modules")
            .message()
            .unwrap()
            .contains("reserved"));
        assert!(validate_project_name("a--b")
            .message()
            .unwrap()
            .contains("consecutive"));
    }

    #[test]
    fn test_project_name_length_limit() {
        let fifty = "a".repeat(50);
        let fifty_one = "a".repeat(51);
        assert_eq!(validate_project_name(&fifty), Validation::Valid);
        assert!(validate_project_name(&fifty_one)
            .message()
            .unwrap()
            .contains("at most 50"));
    }

    #[test]
    fn test_port_table() {
        assert_eq!(validate_port("8000"), Validation::Valid);
        assert!(!validate_port(" 3000 ").is_accepted());
        assert_eq!(validate_port("65535"), Validation::Valid);
        assert!(!validate_port("0").is_accepted());
        assert!(!validate_port("70000").is_accepted());
        assert!(!validate_port("99999999999").is_accepted());
        assert!(!validate_port("-1").is_accepted());
        assert!(!validate_port("80.5").is_accepted());
        assert!(!validate_port("http").is_accepted());
        assert!(!validate_port("").is_accepted());
    }

    #[test]
    fn test_well_known_port_warns() {
        let result = validate_port("443");
        assert!(result.is_accepted());
        assert!(matches!(result, Validation::Warning(ref m) if m.contains("HTTPS")));
    }

    #[test]
    fn test_db_name() {
        assert_eq!(validate_db_name("my_app"), Validation::Valid);
        assert!(!validate_db_name("").is_accepted());
        assert!(!validate_db_name("_app").is_accepted());
        assert!(!validate_db_name("app_").is_accepted());
        assert!(!validate_db_name("my-app").is_accepted());
        assert!(!validate_db_name("MyApp").is_accepted());
        assert!(!validate_db_name(" db ").is_accepted());
        assert!(!validate_db_name("db\t").is_accepted());
    }

    #[test]
    fn test_db_user() {
        assert_eq!(validate_db_user("Postgres_1"), Validation::Valid);
        assert!(!validate_db_user("").is_accepted());
        assert!(!validate_db_user("admin-user").is_accepted());
        assert!(!validate_db_user(" postgres").is_accepted());
        assert!(!validate_db_user("postgres\n").is_accepted());
    }

    #[test]
    fn test_password_policy() {
        assert_eq!(validate_db_password("longenough", true), Validation::Valid);
        assert!(!validate_db_password("", false).is_accepted());
        assert!(matches!(validate_db_password("short", true), Validation::Invalid(_)));
        assert!(matches!(validate_db_password("short", false), Validation::Warning(_)));
    }

    #[test]
    fn test_validators_are_pure() {
        for field in [Field::ProjectName, Field::Port, Field::DbName, Field::DbUser, Field::DbPassword] {
            for input in ["my-app", "443", "", "-x", "a--b", "db_name"] {
                assert_eq!(validate(field, input), validate(field, input));
            }
        }
    }

    #[test]
    fn test_field_parse() {
        assert_eq!("project-name".parse::<Field>(), Ok(Field::ProjectName));
        assert_eq!("db_user".parse::<Field>(), Ok(Field::DbUser));
        assert!("colour".parse::<Field>().is_err());
    }

    #[test]
    fn test_into_result_hides_password() {
        let error = validate(Field::DbPassword, "abc")
            .into_result(Field::DbPassword, "abc")
            .unwrap_err();
        assert_eq!(error.kind(), ErrorKind::InvalidCredentials);
        assert!(error.details().get("value").is_none());

        let error = validate(Field::Port, "70000")
            .into_result(Field::Port, "70000")
            .unwrap_err();
        assert_eq!(error.kind(), ErrorKind::InvalidPort);
        assert_eq!(error.details()["value"], "70000");
    }

    #[test]
    fn test_validate_config_cross_field() {
        let mut config = ProjectConfig::with_defaults("my-app");
        config.db_password = "supersecret".to_string();
        assert!(validate_config(&config, ValidationOptions::default()).is_empty());

        config.frontend_port = "8000".to_string();
        let issues = validate_config(&config, ValidationOptions::default());
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].key, "frontend_port");
        assert!(!issues[0].validation.is_accepted());
    }

    #[test]
    fn test_validate_config_collects_every_issue() {
        let mut config = ProjectConfig::with_defaults("-bad");
        config.db_name = "_x".to_string();
        config.db_password = "short".to_string();
        config.api_port = "443".to_string();

        let issues = validate_config(&config, ValidationOptions::default());
        let keys: Vec<_> = issues.iter().map(|i| i.key).collect();
        assert_eq!(keys, ["name", "db_name", "db_password", "api_port"]);
        assert!(issues[3].validation.is_accepted());
    }
}
