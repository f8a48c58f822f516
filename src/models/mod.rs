// src/models/mod.rs

pub mod question;
pub mod quiz;
pub mod record;
pub mod user;
