pub mod daemon;
pub mod libs;
pub mod ping;
pub mod stop;
pub mod version;
