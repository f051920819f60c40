pub mod blobs;
pub mod morphology;
pub mod motion;
pub mod preprocess;
