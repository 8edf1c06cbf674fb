//! High-level operations behind the `dlindex` commands.

pub mod ops_discover;
pub mod ops_publish;
pub mod ops_render;
pub mod ops_stage;
pub mod ops_verify;
pub mod project;
