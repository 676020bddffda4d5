pub mod command;
pub mod response;
pub mod uart;
