//! Work units and the build/revision toolchain they prepare with.

pub mod toolchain;
pub mod unit;
