//! UI components and application module
//!
//! egui/eframe-based user interface for the chat client.

mod app;
pub mod components;
mod state;
mod theme;

pub use app::ParleyApp;
pub use state::{AppState, HeaderMode, PanelView};
pub use theme::Theme;
