//! Block level elements.

mod delimited;
mod line;
mod list;

pub(crate) use delimited::{DelimitedBlock, default_blocks};
