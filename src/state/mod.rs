pub mod preferences;
pub mod request;
pub mod settings;
