pub mod credential;
pub mod derive;
pub mod ephemeral;
pub mod prf;
pub mod window;
