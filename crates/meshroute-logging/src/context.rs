//! Node context injection for multi-node logging
//!
//! Several mesh nodes often share one process (simulations, integration
//! tests). A thread-local context names the node whose work is running so
//! that spans opened in that scope can be attributed to it.

use std::cell::RefCell;
use std::net::Ipv4Addr;

use tracing::Span;
use uuid::Uuid;

/// Node context data stored in thread-local storage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeContextData {
    /// The node's IP address
    pub node: Ipv4Addr,
    /// Unique instance ID for this node session
    pub instance_id: Uuid,
}

thread_local! {
    static NODE_CONTEXT: RefCell<Option<NodeContextData>> = const { RefCell::new(None) };
}

/// RAII guard for node context
///
/// Sets the node context for the current thread on creation and restores
/// the previous one (if any) on drop.
///
/// # Example
///
/// ```ignore
/// use meshroute_logging::context::NodeContextGuard;
///
/// let _guard = NodeContextGuard::new("10.0.0.1".parse().unwrap());
/// let _span = meshroute_logging::context::node_span().entered();
/// tracing::info!("Recomputing routes");
/// ```
pub struct NodeContextGuard {
    previous: Option<NodeContextData>,
}

impl NodeContextGuard {
    /// Enter a fresh session for `node`
    pub fn new(node: Ipv4Addr) -> Self {
        Self::with_instance_id(node, Uuid::new_v4())
    }

    /// Enter a session with a specific instance ID
    ///
    /// Keeps log lines of a restarted node attributable to one session.
    pub fn with_instance_id(node: Ipv4Addr, instance_id: Uuid) -> Self {
        let data = NodeContextData { node, instance_id };
        let previous = NODE_CONTEXT.with(|ctx| ctx.borrow_mut().replace(data));
        Self { previous }
    }

    /// Get the current node context (if any)
    pub fn current() -> Option<NodeContextData> {
        NODE_CONTEXT.with(|ctx| *ctx.borrow())
    }

    /// Get the current node IP (if set)
    pub fn current_node() -> Option<Ipv4Addr> {
        Self::current().map(|ctx| ctx.node)
    }

    /// Get the current instance ID (if set)
    pub fn current_instance_id() -> Option<Uuid> {
        Self::current().map(|ctx| ctx.instance_id)
    }
}

impl Drop for NodeContextGuard {
    fn drop(&mut self) {
        NODE_CONTEXT.with(|ctx| *ctx.borrow_mut() = self.previous.take());
    }
}

/// A span carrying the current node's IP and instance ID
///
/// Disabled when no context is set.
pub fn node_span() -> Span {
    match NodeContextGuard::current() {
        Some(ctx) => tracing::info_span!(
            "node",
            node = %ctx.node,
            instance_id = %ctx.instance_id
        ),
        None => Span::none(),
    }
}

/// Convenience macro to run a block under a node context
///
/// # Example
///
/// ```ignore
/// with_node_context!(my_ip, {
///     tracing::info!("Processing packet");
/// });
/// ```
#[macro_export]
macro_rules! with_node_context {
    ($node:expr, $body:block) => {{
        let _guard = $crate::context::NodeContextGuard::new($node);
        $body
    }};
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ip(last: u8) -> Ipv4Addr {
        Ipv4Addr::new(10, 0, 0, last)
    }

    #[test]
    fn test_node_context_guard() {
        // No context initially
        assert!(NodeContextGuard::current().is_none());

        {
            let _guard = NodeContextGuard::new(ip(1));
            assert_eq!(NodeContextGuard::current_node(), Some(ip(1)));
            assert!(NodeContextGuard::current_instance_id().is_some());
        }

        // Context should be cleared after guard drops
        assert!(NodeContextGuard::current().is_none());
    }

    #[test]
    fn test_nested_contexts() {
        {
            let _guard_a = NodeContextGuard::new(ip(1));
            let outer = NodeContextGuard::current_instance_id();

            {
                let _guard_b = NodeContextGuard::new(ip(2));
                assert_eq!(NodeContextGuard::current_node(), Some(ip(2)));
            }

            // Restored to the outer node and session
            assert_eq!(NodeContextGuard::current_node(), Some(ip(1)));
            assert_eq!(NodeContextGuard::current_instance_id(), outer);
        }

        assert!(NodeContextGuard::current_node().is_none());
    }

    #[test]
    fn test_with_instance_id() {
        let instance_id = Uuid::new_v4();
        let _guard = NodeContextGuard::with_instance_id(ip(7), instance_id);
        let ctx = NodeContextGuard::current().unwrap();
        assert_eq!(ctx.instance_id, instance_id);
        assert_eq!(ctx.node, ip(7));
    }

    #[test]
    fn test_macro_scopes_context() {
        let seen = with_node_context!(ip(3), { NodeContextGuard::current_node() });
        assert_eq!(seen, Some(ip(3)));
        assert!(NodeContextGuard::current().is_none());
    }

    #[test]
    fn test_node_span_without_context_is_disabled() {
        assert!(node_span().is_disabled());
    }
}
