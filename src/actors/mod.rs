pub mod messages;
pub mod thread_actor;
pub mod thread_registry;

pub use thread_registry::ThreadRegistry;
