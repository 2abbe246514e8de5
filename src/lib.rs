pub mod bridge;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod grbl;
pub mod presets;
pub mod serial;
pub mod util;
pub mod visca;

#[cfg(test)]
mod testing;
