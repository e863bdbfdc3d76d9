pub mod auth;
pub mod rate;
pub mod upstream;
