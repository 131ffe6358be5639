// src/lib.rs

//! poolwatch: announces new vehicles on the lease-pool portal.

pub mod error;
pub mod models;
pub mod pipeline;
pub mod services;
pub mod storage;
pub mod utils;
