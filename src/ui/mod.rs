pub mod render;

pub use render::ProgressPrinter;
