//! Engine services that do not touch the GPU: logging, command-line
//! handling, the camera, and input mapping.

pub mod camera;
pub mod cli;
pub mod input;
pub mod logging;
