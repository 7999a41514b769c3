pub mod adb;
pub mod transport;
