pub mod resolver;

pub use resolver::resolve_audio_stream;
