// Adapters layer: concrete implementations for external systems (window system, ...)

pub mod desktop;

pub use desktop::{desktop_from_name, NullDesktop, XdotoolDesktop};
