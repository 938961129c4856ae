#![forbid(unsafe_code)]

mod scene;

pub use scene::{demo_catalog, init_tracing, save_png, synthetic_patches, synthetic_scene};
