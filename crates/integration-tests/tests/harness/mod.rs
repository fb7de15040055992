#![allow(dead_code)]

pub mod backend;
pub mod config;
pub mod downstream;
pub mod server;
