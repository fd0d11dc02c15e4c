pub mod clock_sync;
pub mod ring_buffer;
pub mod sample_format;
