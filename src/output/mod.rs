//! Export destinations and the PDF summary

pub mod export;
pub mod pdf;

pub use export::{summary_lines, ExportCoordinator, ExportReport};
pub use pdf::{PdfLine, PdfWriter};
