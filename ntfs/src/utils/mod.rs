//! Low-level helpers shared by the parsing layers

pub mod bytes;
pub mod sector;
pub mod string;
