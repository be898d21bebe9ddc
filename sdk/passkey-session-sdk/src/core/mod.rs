pub mod authenticator;
pub mod connection;
pub mod constants;
