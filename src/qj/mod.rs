pub mod embeddings;
pub mod labels;
pub mod model;
pub mod subcluster;
pub mod table;
