pub mod assumption_registry;

pub use assumption_registry::AssumptionRegistry;
