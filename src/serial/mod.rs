pub mod connection;
pub mod pump;
pub mod transmit;
