pub mod capture;
pub mod config;
pub mod error;
pub mod history;
pub mod hook;
pub mod logging;
pub mod normalize;
pub mod paths;
pub mod store;
