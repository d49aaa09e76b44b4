pub mod config;
pub mod engine;
pub mod error;
pub mod pipeline;
pub mod request;
pub mod web;

pub use config::Configuration;
pub use engine::{HelmCli, LoadedChart, RenderEngine, RenderError, RenderSettings};
pub use error::{ErrorKind, TemplateError};
pub use pipeline::{Pipeline, Rendered};
pub use request::{OutputFormat, RequestError, TemplateRequest};
