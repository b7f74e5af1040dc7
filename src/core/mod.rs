pub mod config;
pub mod conversation;
pub mod keyring;
pub mod message;
pub mod models;
pub mod quota;
pub mod session;
pub mod storage;
pub mod validation;
