//! The configuration collected for a project before generation.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Frontend component library.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UiLibrary {
    /// Material UI
    #[default]
    Mui,
    /// Tailwind CSS
    Tailwind,
}

impl fmt::Display for UiLibrary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UiLibrary::Mui => f.write_str("mui"),
            UiLibrary::Tailwind => f.write_str("tailwind"),
        }
    }
}

impl FromStr for UiLibrary {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "mui" | "material" | "material-ui" => Ok(UiLibrary::Mui),
            "tailwind" | "tailwindcss" => Ok(UiLibrary::Tailwind),
            other => Err(format!("unknown UI library '{}'", other)),
        }
    }
}

/// Everything the generator needs to know about the project to create.
///
/// Ports are kept as the raw strings the user entered so validation can
/// report exactly what was typed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectConfig {
    pub name: String,
    pub ui_library: UiLibrary,
    pub db_name: String,
    pub db_user: String,
    #[serde(default, skip_serializing)]
    pub db_password: String,
    pub api_port: String,
    pub frontend_port: String,
    /// Optional features requested by the user (e.g. `docker`, `git`).
    #[serde(default)]
    pub features: Vec<String>,
}

impl ProjectConfig {
    /// A config with the generator's default answers for `name`.
    pub fn with_defaults(name: impl Into<String>) -> Self {
        let name = name.into();
        let db_name = name.replace('-', "_");
        Self {
            name,
            ui_library: UiLibrary::default(),
            db_name,
            db_user: "postgres".to_string(),
            db_password: String::new(),
            api_port: "8000".to_string(),
            frontend_port: "3000".to_string(),
            features: vec!["docker".to_string(), "git".to_string()],
        }
    }

    /// The API port, if it parses.
    pub fn api_port_number(&self) -> Option<u16> {
        self.api_port.parse().ok()
    }

    /// The frontend port, if it parses.
    pub fn frontend_port_number(&self) -> Option<u16> {
        self.frontend_port.parse().ok()
    }
}
