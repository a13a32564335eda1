pub mod api;
pub mod commands;
pub mod config;
pub mod confirm;
pub mod database;
pub mod drafts;
pub mod editor;
pub mod error;
pub mod monitor;
pub mod session;
pub mod ui;
pub mod view;

#[cfg(test)]
pub(crate) mod testing;
