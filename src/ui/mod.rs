pub mod progress;
pub mod prompt;
pub mod render;

pub use progress::{create_spinner, spinner_if};
pub use prompt::{confirm_line, ConfirmPrompt};
pub use render::Renderer;
