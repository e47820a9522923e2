pub mod payload;
pub mod topics;
