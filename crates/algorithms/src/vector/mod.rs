//! Raster-to-vector conversion
//!
//! - Polygonize: outline connected class regions as polygons with holes

mod polygonize;

pub use polygonize::{polygonize, CLASS_PROPERTY};
