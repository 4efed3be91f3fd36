//! Background queue processing engine.

pub mod processor;

pub use processor::QueueProcessor;
