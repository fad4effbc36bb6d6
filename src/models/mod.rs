pub mod chat;
pub mod event;
