//! The recursive resolution core: instance keys, the resolution output,
//! the per-frame traversal node, and the driver.

mod key;
mod node;
mod resolution;
mod resolver;

pub use key::{ComponentInstanceKey, ROOT_COMPONENT};
pub use resolution::{ComponentInstance, Resolution};
pub use resolver::{CancelToken, PolicyResolver, ResolverConfig};
