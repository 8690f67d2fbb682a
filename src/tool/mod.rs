//! External tool adapters
//!
//! Everything that crosses a process boundary lives here: the generic
//! subprocess runner plus one adapter per tool contract.

pub mod command;
pub mod enhancer;
pub mod ffmpeg;
pub mod separator;

pub use command::{ToolCommand, ToolOutput, resolve_program};
pub use enhancer::Enhancer;
pub use ffmpeg::{Ffmpeg, repair_file};
pub use separator::Separator;
