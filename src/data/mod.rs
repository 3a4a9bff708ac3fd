pub mod channels;
pub mod custom_names;
pub mod loader;
pub mod parser;
pub mod scale_file;
