//! Engine data structures: models, textures, scene graphs, and instances.
//!
//! This module contains the core data types for scene representation:
//!
//! - `model` contains mesh and material definitions, GPU resources for 3D models
//! - `texture` contains GPU texture wrapper, creation utilities and sampling modes
//! - `instance` holds per-instance transformation and attribute data
//! - `scene_graph` enables hierarchical scene organization
//! - `primitives` builds the procedural ground and sphere meshes

pub mod instance;
pub mod model;
pub mod primitives;
pub mod scene_graph;
pub mod texture;
