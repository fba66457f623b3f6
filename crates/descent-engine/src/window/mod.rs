//! Window and graphics context lifecycle.
//!
//! `WindowManager` owns every native window, its graphics context and the
//! registry of GPU objects created in those contexts.

mod config;
mod manager;
mod state;

pub use config::WindowConfig;
pub use manager::{WindowId, WindowManager};
pub use state::WindowState;
