pub mod cli;
pub mod config;
pub mod generate;
pub mod input;
pub mod model;
pub mod present;
pub mod server;
pub mod studio;
#[doc(hidden)]
pub mod test_support;
