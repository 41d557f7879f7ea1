pub mod append;
pub mod integrity;
