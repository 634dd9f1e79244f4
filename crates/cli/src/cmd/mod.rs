mod compile;
mod detect;
mod release;

pub use compile::cmd_compile;
pub use detect::cmd_detect;
pub use release::cmd_release;
