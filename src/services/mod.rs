pub mod export;
pub mod generator;
pub mod llm;
pub mod parser;
pub mod projector;
#[cfg(not(target_arch = "wasm32"))]
pub mod server;
