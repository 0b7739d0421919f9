pub mod commands;
pub mod pack;
