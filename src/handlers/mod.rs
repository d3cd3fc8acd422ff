// src/handlers/mod.rs
pub mod admin;
pub mod assets;
pub mod auth;
pub mod chat;
pub mod tasks;
