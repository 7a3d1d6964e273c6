#![allow(dead_code)]

pub mod command;
pub mod engine;
pub mod file;
