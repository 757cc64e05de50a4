//! I/O modules for reading raster bands, labeled vector polygons, and
//! writing classification products

pub mod raster;
pub mod rasterize;
pub mod vector;

pub use raster::{BandReader, ClassifiedWriter};
pub use rasterize::geometry_mask;
pub use vector::VectorReader;
