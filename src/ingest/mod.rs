//! Point ingestion
//!
//! Validates incoming pointer samples and buffers them in a fixed-capacity
//! ring. Transport (hook, socket, file replay) is a caller concern; this
//! module only sees an ordered sequence of point records.

pub mod point;
pub mod ring;

pub use point::{Point, PointRecord};
pub use ring::PointRing;
