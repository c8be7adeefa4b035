//! Native method implementations for the core classes
//!
//! Each module exposes `init_*` functions that bind its primitives to a
//! class during bootstrap.

pub mod boolean;
pub mod class;
pub mod fiber;
pub mod function;
pub mod helpers;
pub mod io;
pub mod list;
pub mod null;
pub mod number;
pub mod object;
pub mod range;
pub mod string;
