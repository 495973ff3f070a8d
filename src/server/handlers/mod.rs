pub mod chat;
pub mod files;
pub mod index;
pub mod status;
