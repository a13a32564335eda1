pub mod controller;
pub mod template;
pub mod types;

pub use controller::EditorController;
pub use template::{format_prompt, insert_variable, template_variables};
pub use types::*;
