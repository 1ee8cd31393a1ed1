pub mod accumulator;
pub mod config;
pub mod dates;
pub mod entry;
pub mod export;
pub mod page;
pub mod parse_page;
pub mod paths;
pub mod pdf;
pub mod sink;

#[cfg(test)]
mod tests;

pub use accumulator::EntryAccumulator;
pub use config::Config;
pub use entry::{CompletedEntry, Entry};
pub use export::{EmittedEntry, ExportSummary, Exporter, export_pages};
pub use page::{DocumentReader, PageImage, PageView};
pub use pdf::PdfDocument;
pub use sink::{DryRunSink, Exiftool, FsImageSink, ImageRecord, ImageSink};
