mod build;
mod rasterize;
mod verify;

pub use build::run as build;
pub use rasterize::run as rasterize;
pub use verify::run as verify;
