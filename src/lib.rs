pub mod config;
pub mod gesture;
pub mod hand;
pub mod session;
pub mod shape;
pub mod stroke;
