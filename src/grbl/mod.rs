pub mod commands;
pub mod lines;
pub mod machine;
pub mod messages;
pub mod parser;
pub mod realtime;
