pub mod extractor;
pub mod fetcher;
pub mod layout;
pub mod pipeline;
pub mod serializer;
pub mod types;
