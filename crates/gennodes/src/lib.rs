//! Built-in generation handlers
//!
//! Every handler here is a mock returning canned payloads; real backends
//! plug in through the same `NodeHandler` contract.

mod code;
mod common;
mod media;
mod model;
mod text;

pub use code::CodeHandler;
pub use media::{AudioHandler, ImageHandler, VideoHandler};
pub use model::ModelHandler;
pub use text::TextHandler;
use genruntime::HandlerRegistry;

use std::sync::Arc;

/// Register all built-in handlers with a registry
pub fn register_all(registry: &mut HandlerRegistry) {
    registry.register(Arc::new(ImageHandler));
    registry.register(Arc::new(VideoHandler));
    registry.register(Arc::new(AudioHandler));
    registry.register(Arc::new(CodeHandler));
    registry.register(Arc::new(ModelHandler));
    registry.register(Arc::new(TextHandler));
}
