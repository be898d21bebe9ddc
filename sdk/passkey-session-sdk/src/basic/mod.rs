pub mod delegation;
pub mod grants;
pub mod session;
