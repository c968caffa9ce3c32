mod flame_cmd;

pub use flame_cmd::*;
