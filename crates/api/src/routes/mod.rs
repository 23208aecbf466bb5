//! Route handlers

pub mod control;
pub mod status;
