pub mod auto_exposure;
pub mod logger;
