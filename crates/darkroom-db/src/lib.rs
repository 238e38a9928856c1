//! Local store adapter: a typed query surface whose statements execute on
//! the far side of a process boundary.

pub mod db;
pub mod error;
pub mod model;
