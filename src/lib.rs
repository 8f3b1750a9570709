pub mod config;
pub mod detection;
pub mod follower;
pub mod frames;
pub mod handshake;
pub mod models;
pub mod overlay;
pub mod pipeline;
pub mod serial;

pub use config::AppConfig;
pub use detection::FrameAnalyzer;
pub use follower::{Command, LineFollower};
pub use models::{ColorName, ColorVerdict, Contour, FrameReport, ShapeKind};
pub use pipeline::{
    Pipeline, PipelineData, PipelineStep, PipelineContext,
    BoundingBox, MetadataValue, DebugConfig
};
pub use serial::{CommandLink, SerialLink};
