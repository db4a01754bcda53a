pub mod graph;
pub mod llm;
pub mod message;
pub mod oracle;
pub mod state;
