mod fault_injector;
pub use fault_injector::*;
