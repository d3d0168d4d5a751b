pub mod amap;
pub mod echo;
pub mod music;
pub mod registry;

pub use amap::{PoiSearchTool, RoutePlannerTool};
pub use echo::EchoTool;
pub use music::MusicPlatform;
pub use registry::{Tool, ToolRegistry};

#[cfg(feature = "browser")]
pub use music::{MusicPlayTool, MusicSearchTool};
