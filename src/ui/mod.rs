pub mod chat;
pub mod history;
pub mod layout;
