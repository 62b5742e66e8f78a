pub mod assets;
pub mod gate;
pub mod ports;
pub mod process;
