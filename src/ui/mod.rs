pub mod loading;
pub mod notifications;

pub use loading::LoadingIndicator;
pub use notifications::*;
