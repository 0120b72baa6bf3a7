mod depth;

pub use depth::{depth_histogram, object_depth, DepthBucket, DEAD_DEPTH};
