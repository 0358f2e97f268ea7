//! Local static-map image cache

pub mod image_store;
pub mod static_map_cache;

pub use image_store::{FsImageStore, ImageStore, MemoryImageStore};
pub use static_map_cache::{ImageRef, StaticMapCache, IMAGE_EXTENSION};
