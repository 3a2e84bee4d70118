//! Authentication core: credential hashing, the token codec, the user
//! directory, and the service that orchestrates them.

pub mod password;
pub mod service;
pub mod store;
pub mod token;
pub mod user;
