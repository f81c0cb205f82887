pub mod interactive;
pub mod run;

pub use interactive::run_interactive;
pub use run::run_once;
