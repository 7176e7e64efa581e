#![allow(dead_code)]

pub mod fetch;
pub mod models;
