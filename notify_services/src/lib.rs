pub mod config;
pub mod error;
pub mod notification;
pub mod services;
#[cfg(test)]
pub mod tests;
