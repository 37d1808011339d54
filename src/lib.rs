//////////////////////////////////////////////////////////////////////
// tile count estimates and layout pictures for floors and walls

#[macro_use]
extern crate error_chain;

pub mod errors;
pub mod geometry;
pub mod canvas;
pub mod layout;
pub mod scene;
pub mod postprocess;
pub mod job;

pub use crate::errors::{Error, ErrorKind, Result};
pub use crate::geometry::{LayingMethod, Surface, TileSpec, DoorCutout, Estimate};
pub use crate::layout::YDirection;
pub use crate::scene::{SceneConfig, render_floor, render_room_walls};
pub use crate::job::{Job, JobResult};
