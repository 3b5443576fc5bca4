mod connect;
mod report;
mod sink;
mod source;
mod tables;

pub use connect::*;
pub use report::*;
pub use sink::*;
pub use source::*;
pub use tables::*;
