pub mod config;
pub mod io;
pub mod locator;
pub mod model;
pub mod state;
