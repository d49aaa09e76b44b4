pub mod archive;
pub mod client;
pub mod error;
pub mod files;
pub mod locator;
pub mod workspace;

pub use archive::{extract, extract_async, ExtractLimits, ExtractedTree};
pub use client::{ChartClient, DownloadedArchive, FetchLimits};
pub use error::{ChartError, ErrorKind};
pub use locator::{locate, ChartTree};
