pub mod access;
pub mod admin;
pub mod health;
pub mod pairing;
pub mod posts;
pub mod relations;
