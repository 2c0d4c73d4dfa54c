pub mod api;
pub mod coordinator;
pub mod entry;
pub mod model;
pub mod sensor;
pub mod settings;

pub use api::Error;
