//! Task tracker service: password and Google sign-in, cookie-carried
//! sessions, per-user todos.

pub mod app;
pub mod auth;
pub mod config;
pub mod error;
pub mod state;
pub mod todos;
