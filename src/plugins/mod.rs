// 規劃器可用的示範插件
pub mod email;
pub mod fun;
pub mod writer;

pub use email::EmailPluginFake;
pub use fun::FunPluginFake;
pub use writer::{WriterPluginFake, DEFAULT_END_MARKER};
