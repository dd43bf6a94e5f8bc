//! Terminal output: error panels, warnings, spinners and Ctrl+C handling.

mod colors;
mod interrupt;
mod panel;
mod spinner;

pub use colors::Theme;
pub use interrupt::InterruptHandler;
pub use panel::{DebugInfo, PanelContent, PanelRenderer};
pub use spinner::StepSpinner;
