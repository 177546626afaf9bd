mod ascii;
mod error;
pub mod pipeline;
mod placement;
mod primitive;
pub mod raster;
pub mod sizing;
mod style;
pub mod svg;

pub use ascii::{render_roles, AsciiRenderer};
pub use error::SinkError;
pub use pipeline::{render, render_symbol};
pub use placement::{place, ImageMode, RESAMPLE_FILTER};
pub use primitive::{DrawPrimitive, Drawing, ImageSlot, ModuleMask, Shape};
pub use raster::{render_to_size, write_gif, Rasterizer};
pub use style::{
    Backdrop, BasicParams, IconDescriptor, ImageFillParams, ImagePayload, ModuleShape,
    PatternParams, PatternTreatment, PositionParams, PositionStyle, RandomRectangleParams,
    StyleConfig, StyleKind, WatermarkDescriptor,
};
pub use svg::SvgWriter;
