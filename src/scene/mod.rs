//! The fixed set of things the demo frame draws.

mod axes;
mod polygon;
mod shape;
mod skybox;

pub use axes::Axes;
pub use polygon::{ImageProducer, SimplePolygon, SolidFill};
pub use shape::Shape;
pub use skybox::SkyBox;
