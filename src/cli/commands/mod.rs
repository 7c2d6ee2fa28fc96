//! CLI command implementations.

mod config;
mod doctor;
mod models;
mod prompt;
mod serve;
mod summarize;

pub use config::run_config;
pub use doctor::run_doctor;
pub use models::run_models;
pub use prompt::run_prompt;
pub use serve::{router, run_serve};
pub use summarize::run_summarize;
