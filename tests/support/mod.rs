#![allow(dead_code)]

pub mod architecture;
pub mod assertions;
pub mod market;
