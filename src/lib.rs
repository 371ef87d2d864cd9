pub mod error;
pub mod hashlife;
pub mod pattern;
pub mod quadtree;
pub mod rules;
pub mod world;

pub use error::Error;
pub use error::Result;
pub use quadtree::node::Level;
pub use quadtree::node::NodeId;
pub use world::World;

/// Install the tracing subscriber with custom formatting. Binaries and demos
/// call this once; the library itself never installs a subscriber.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(true) // Keep the target (module path)
        .with_ansi(true) // Enable colors
        .without_time()
        .init();
}
