pub mod gatekeeper;
pub mod password;
pub mod service;
pub mod session;
