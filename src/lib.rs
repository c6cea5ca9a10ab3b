#![allow(dead_code)]

#[macro_use]
extern crate quick_error;

#[cfg(test)]
#[macro_use]
extern crate pretty_assertions;

pub mod breakpoints;
pub mod cpu;
pub mod debug;
pub mod error;
pub mod flags;
pub mod machine;
pub mod memory;
pub mod op;
pub mod operand;
pub mod program;
pub mod register;
