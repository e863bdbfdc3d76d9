pub mod dpop;
pub mod jwk;
pub mod jws;
pub mod replay;
pub mod token;
