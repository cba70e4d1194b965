mod classifier;
mod event;
mod monitor;
mod walker;
mod watermark;

#[cfg(test)]
mod testing;

pub use event::StdoutSink;
pub use monitor::Monitor;
