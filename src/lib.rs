pub mod config;
pub mod document;
pub mod error;
pub mod lookup;
pub mod params;
pub mod prompt;
pub mod provision;
pub mod system;
pub mod uri;
