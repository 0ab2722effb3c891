//! Offline reporting for LoadLane request logs: per-user interval-forest
//! reconstruction and SVG swimlane rendering.

pub mod forest;
pub mod svg;

pub use forest::{build_forests, ActorForest, MalformedIntervalError};
pub use svg::{format_duration, render_svg, SvgOptions};
