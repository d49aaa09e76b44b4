mod chart;

pub use chart::{ChartDependency, ChartMetadata, MetadataError, CHART_FILE};
