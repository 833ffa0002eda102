//! Bearer-token authentication. Tokens are issued by the identity service;
//! this crate only validates them and loads the user.

pub mod jwt;
pub mod middleware;
