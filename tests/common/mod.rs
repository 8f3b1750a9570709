#![allow(dead_code)]

mod fixtures;
pub use fixtures::*;

// Re-export commonly used types from shapepilot for tests
pub use shapepilot::config::{AppConfig, ClassifierConfig, FollowerConfig, HandshakeConfig};
pub use shapepilot::models::{ColorName, ColorVerdict, Contour, ShapeKind};
