pub mod config;
pub mod logging;
pub mod overlay;
pub mod service;
pub mod session;
pub mod studio;
#[doc(hidden)]
pub mod test_support;
pub mod tree;
