pub mod command;
pub mod rest;
pub mod status;
