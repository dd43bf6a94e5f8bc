use clap::{ArgAction, Parser};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use stackwizard::cleanup::CleanupService;
use stackwizard::config::WizardSettings;
use stackwizard::logging::{init_logging, Logger, LoggerConfig, LoggingConfig};
use stackwizard::port::{is_port_free, suggest_free_port};
use stackwizard::project::{ProjectConfig, UiLibrary};
use stackwizard::recovery::{ErrorContext, RecoveryContext, RecoveryCoordinator};
use stackwizard::requirements::SystemRequirementChecker;
use stackwizard::ui::{InterruptHandler, PanelRenderer, StepSpinner, Theme};
use stackwizard::validation::{validate_with, Field, Validation, ValidationOptions};
use stackwizard::workflow::{exit_codes, GenerationWorkflow, RunStatus, WorkflowOptions};

#[derive(Parser, Debug)]
#[command(name = "stackwizard")]
#[command(version)]
#[command(about = "Generate full-stack FastAPI + React projects")]
struct Cli {
    /// Write JSON-lines debug logs to ~/.stackwizard/logs
    #[arg(long, global = true)]
    debug: bool,

    /// Disable colors (also respects NO_COLOR environment variable)
    #[arg(long, global = true)]
    no_color: bool,

    /// Suppress all output except errors
    #[arg(long, short, global = true)]
    quiet: bool,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short, action = ArgAction::Count, conflicts_with = "quiet", global = true)]
    verbose: u8,

    /// Settings file (defaults to ./stackwizard.toml when present)
    #[arg(long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Generate a new project
    New {
        /// Project name (lowercase letters, numbers and hyphens)
        name: String,

        /// Database name [default: project name with underscores]
        #[arg(long)]
        db_name: Option<String>,

        /// Database user
        #[arg(long, default_value = "postgres")]
        db_user: String,

        /// Database password
        #[arg(long)]
        db_password: Option<String>,

        /// Backend API port
        #[arg(long, default_value = "8000")]
        api_port: String,

        /// Frontend dev server port
        #[arg(long, default_value = "3000")]
        frontend_port: String,

        /// UI library: mui or tailwind
        #[arg(long, default_value = "mui")]
        ui: UiLibrary,

        /// Parent directory of the project [default: current directory]
        #[arg(long, short = 'd')]
        dir: Option<PathBuf>,

        /// Run npm install after generation
        #[arg(long)]
        install: bool,
    },
    /// Check that required tools are installed
    Doctor,
    /// Validate a single value
    Validate {
        /// project-name, port, db-name, db-user or db-password
        field: Field,

        /// Value to check
        #[arg(allow_hyphen_values = true)]
        value: String,
    },
    /// Check whether a local port is free
    Port {
        port: u16,
    },
    /// Remove a generated project, backing up large trees first
    Cleanup {
        path: PathBuf,
    },
}

/// Shared state every command needs.
struct Session {
    settings: WizardSettings,
    logger: Arc<Logger>,
    theme: Theme,
    quiet: bool,
}

impl Session {
    fn coordinator(&self) -> RecoveryCoordinator {
        RecoveryCoordinator::new(Arc::clone(&self.logger), PanelRenderer::new(self.theme))
            .with_max_attempts(self.settings.max_recovery_attempts)
    }

    fn say(&self, line: &str) {
        if !self.quiet {
            println!("{}", line);
        }
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let use_color = !cli.no_color && std::env::var_os("NO_COLOR").is_none();
    let mut settings = match WizardSettings::load(cli.config.as_deref()) {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Error: {}", e);
            return Ok(exit_codes::failed());
        }
    };
    settings.debug |= cli.debug;

    init_logging(LoggingConfig::from_flags(settings.debug, cli.verbose, cli.quiet).with_ansi(use_color));

    let session = Session {
        logger: Arc::new(Logger::new(&LoggerConfig::from(&settings))),
        theme: Theme::default().with_colors(use_color),
        quiet: cli.quiet,
        settings,
    };

    let code = match cli.command {
        Commands::New {
            name,
            db_name,
            db_user,
            db_password,
            api_port,
            frontend_port,
            ui,
            dir,
            install,
        } => {
            let mut config = ProjectConfig::with_defaults(&name);
            if let Some(db_name) = db_name {
                config.db_name = db_name;
            }
            config.db_user = db_user;
            config.db_password = db_password.unwrap_or_default();
            config.api_port = api_port;
            config.frontend_port = frontend_port;
            config.ui_library = ui;

            let parent = match dir {
                Some(dir) => dir,
                None => std::env::current_dir()?,
            };
            run_new(&session, config, parent.join(&name), install).await
        }
        Commands::Doctor => run_doctor(&session).await,
        Commands::Validate { field, value } => run_validate(&session, field, &value),
        Commands::Port { port } => run_port(&session, port).await,
        Commands::Cleanup { path } => run_cleanup(&session, &path),
    };

    if let Some(path) = session.logger.log_path() {
        if !session.quiet {
            eprintln!("Debug log: {}", path.display());
        }
    }
    Ok(code)
}

async fn run_new(session: &Session, config: ProjectConfig, target: PathBuf, install: bool) -> ExitCode {
    let interrupt = InterruptHandler::new();
    if let Err(e) = interrupt.install_handler() {
        session
            .logger
            .warn(&format!("could not install Ctrl+C handler: {}", e), None);
    }

    let mut workflow = GenerationWorkflow::new(session.settings.clone(), Arc::clone(&session.logger), session.theme)
        .with_options(WorkflowOptions {
            install,
            quiet: session.quiet,
        })
        .with_interrupt(interrupt);
    let report = workflow.run(&config, &target).await;
    let theme = &session.theme;

    match &report.status {
        RunStatus::Completed => {
            session.say(&format!(
                "{} Created {} at {}",
                theme.paint_bold("✓", theme.success),
                config.name,
                report.target.display()
            ));
            for feature in &report.skipped_features {
                session.say(&format!(
                    "{} Skipped {} (not installed)",
                    theme.paint("⚠", theme.warning),
                    feature
                ));
            }
            for note in &report.notes {
                session.say(&format!("{} {}", theme.paint("→", theme.info), note));
            }
        }
        RunStatus::NeedsInput { .. } => {
            eprintln!("Fix the problem above and run the command again.");
        }
        RunStatus::Failed { .. } => {
            if let Some(cleanup) = &report.cleanup {
                if cleanup.removed {
                    eprintln!("Removed partially generated {}", report.target.display());
                }
            }
        }
    }
    if let Some(path) = &report.report_file {
        eprintln!("Error report: {}", path.display());
    }
    report.exit_code()
}

async fn run_doctor(session: &Session) -> ExitCode {
    let checker = SystemRequirementChecker::new(session.settings.probe_timeout());
    let spinner = StepSpinner::start("Checking system requirements", session.theme, session.quiet);
    let theme = &session.theme;

    match checker.check_all(&session.logger).await {
        Ok(report) => {
            spinner.finish_and_clear();
            for (name, status) in report.iter() {
                let (icon, color) = match (status.installed, status.meets_minimum) {
                    (true, Some(false)) => ("⚠", theme.warning),
                    (true, _) => ("✓", theme.success),
                    (false, _) => ("✗", theme.muted),
                };
                let version = status
                    .version
                    .map(|v| v.to_string())
                    .unwrap_or_else(|| "not installed".to_string());
                let optional = if status.optional { " (optional)" } else { "" };
                session.say(&format!("{} {:<8} {}{}", theme.paint(icon, color), name, version, optional));
            }
            exit_codes::success()
        }
        Err(e) => {
            spinner.finish_with_error("System requirements not met");
            let mut state = RecoveryContext::new();
            session
                .coordinator()
                .report_error(&e, &ErrorContext::new().with_stage("preflight"), &mut state)
                .await;
            exit_codes::failed()
        }
    }
}

fn run_validate(session: &Session, field: Field, value: &str) -> ExitCode {
    let options = ValidationOptions {
        strict_passwords: session.settings.strict_passwords,
    };
    let theme = &session.theme;
    match validate_with(field, value, options) {
        Validation::Valid => {
            session.say(&format!("{} {} is valid", theme.paint("✓", theme.success), field));
            exit_codes::success()
        }
        Validation::Warning(message) => {
            session.say(&format!("{} {}", theme.paint("⚠", theme.warning), message));
            exit_codes::success()
        }
        Validation::Invalid(message) => {
            eprintln!("{} {}", theme.paint("✗", theme.error), message);
            exit_codes::failed()
        }
    }
}

async fn run_port(session: &Session, port: u16) -> ExitCode {
    let theme = &session.theme;
    if is_port_free(port).await {
        session.say(&format!("{} Port {} is free", theme.paint("✓", theme.success), port));
        return exit_codes::success();
    }
    let hint = match suggest_free_port(port).await {
        Some(free) => format!("; port {} is free", free),
        None => String::new(),
    };
    eprintln!("{} Port {} is in use{}", theme.paint("✗", theme.error), port, hint);
    exit_codes::failed()
}

fn run_cleanup(session: &Session, path: &std::path::Path) -> ExitCode {
    let service = CleanupService::new(Arc::clone(&session.logger))
        .with_threshold(session.settings.backup_threshold_bytes)
        .with_theme(session.theme);
    let outcome = service.cleanup(path);
    if !outcome.existed {
        session.say(&format!("Nothing to remove at {}", path.display()));
        return exit_codes::success();
    }
    if outcome.removed {
        session.say(&format!(
            "{} Removed {}",
            session.theme.paint("✓", session.theme.success),
            path.display()
        ));
        exit_codes::success()
    } else {
        exit_codes::failed()
    }
}
