//! Bounded search over the session object graph
//!
//! The TLS abstraction hands the capture site a layered stream object with
//! no stable contract for where the native session lives. The locator
//! walks that graph depth-first, accepts the first node that exposes a
//! valid handle under a secure-transport type marker, and caches the child
//! index path process-wide so later sessions of the same build replay the
//! path instead of searching again. A cached path that stops yielding a
//! valid handle (a library upgrade changed the layering) falls back to a
//! full rediscovery rather than failing permanently.

use std::ffi::c_void;
use std::sync::OnceLock;

use parking_lot::RwLock;

/// Maximum number of hops from the session root.
pub const MAX_DEPTH: usize = 4;

/// Labels a node must carry (case-insensitively) for the search to
/// descend into it; everything outside the TLS/networking namespaces is
/// skipped as a non-candidate.
const NAMESPACE_MARKERS: &[&str] = &["ssl", "tls", "net", "pqtrace"];

/// Markers associated with secure-transport context handles; a handle is
/// only accepted from a node whose label carries one of these.
const HANDLE_MARKERS: &[&str] = &["Ssl", "Context"];

/// Borrowed pointer to the native `SSL` object.
///
/// The session owns the underlying object; the locator never frees it and
/// only hands it to the resolver, which pins it for the duration of each
/// native call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawSessionHandle(*mut c_void);

impl RawSessionHandle {
    pub fn new(ptr: *mut c_void) -> Self {
        Self(ptr)
    }

    pub fn as_ptr(&self) -> *mut c_void {
        self.0
    }

    pub fn is_valid(&self) -> bool {
        !self.0.is_null()
    }
}

/// One node of the opaque session object graph.
///
/// Implementations wrap whatever layering the transport stack produced
/// (stream enums, buffering adapters, the TLS session itself) and expose
/// just enough structure for the bounded search: a type label, child
/// nodes, and optionally the native handle.
pub trait SessionNode {
    /// Type label used for the namespace filter and the handle marker
    /// check, conventionally `std::any::type_name` of the wrapped type.
    fn label(&self) -> &'static str;

    /// Structural children of this node. Primitive and text-valued fields
    /// are not part of the graph.
    fn children(&self) -> Vec<&dyn SessionNode>;

    /// The native session handle, if this node carries one.
    fn handle(&self) -> Option<RawSessionHandle> {
        None
    }
}

/// Depth-bounded locator with a replayable discovered path.
#[derive(Default)]
pub struct HandleLocator {
    path: RwLock<Option<Box<[usize]>>>,
}

impl HandleLocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Find the native session handle reachable from `root`.
    ///
    /// Fast path: replay the cached child-index path. Slow path: full
    /// discovery, caching the winning path. Returns `None` when no valid
    /// handle exists within [`MAX_DEPTH`] hops; the caller treats that as
    /// a soft failure.
    pub fn locate(&self, root: &dyn SessionNode) -> Option<RawSessionHandle> {
        if let Some(path) = self.path.read().clone() {
            if let Some(handle) = replay(root, &path) {
                if handle.is_valid() {
                    return Some(handle);
                }
            }
        }

        let mut path = Vec::new();
        let handle = search(root, 0, &mut path)?;
        *self.path.write() = Some(path.into_boxed_slice());
        Some(handle)
    }

    /// Whether a discovered path is currently cached.
    pub fn has_cached_path(&self) -> bool {
        self.path.read().is_some()
    }

    #[cfg(test)]
    fn cached_path(&self) -> Option<Box<[usize]>> {
        self.path.read().clone()
    }
}

/// Process-wide locator shared by every connection; concurrent first-time
/// discovery is benign because all discoverers converge on the same path
/// for a given runtime build.
pub(crate) fn session_locator() -> &'static HandleLocator {
    static LOCATOR: OnceLock<HandleLocator> = OnceLock::new();
    LOCATOR.get_or_init(HandleLocator::new)
}

fn replay(root: &dyn SessionNode, path: &[usize]) -> Option<RawSessionHandle> {
    let mut current = root;
    for &index in path {
        current = current.children().into_iter().nth(index)?;
    }
    current.handle()
}

fn search(
    node: &dyn SessionNode,
    depth: usize,
    path: &mut Vec<usize>,
) -> Option<RawSessionHandle> {
    if let Some(handle) = node.handle() {
        if handle.is_valid() && has_handle_marker(node.label()) {
            return Some(handle);
        }
    }

    if depth >= MAX_DEPTH {
        return None;
    }

    for (index, child) in node.children().into_iter().enumerate() {
        if !in_session_namespace(child.label()) {
            continue;
        }
        path.push(index);
        if let Some(handle) = search(child, depth + 1, path) {
            return Some(handle);
        }
        path.pop();
    }

    None
}

fn has_handle_marker(label: &str) -> bool {
    HANDLE_MARKERS.iter().any(|marker| label.contains(marker))
}

fn in_session_namespace(label: &str) -> bool {
    let label = label.to_ascii_lowercase();
    NAMESPACE_MARKERS.iter().any(|marker| label.contains(marker))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    /// Mock graph node with a visit counter on `children`.
    struct MockNode {
        label: &'static str,
        handle: Option<RawSessionHandle>,
        children: Vec<MockNode>,
        visits: Cell<usize>,
    }

    impl MockNode {
        fn branch(label: &'static str, children: Vec<MockNode>) -> Self {
            Self {
                label,
                handle: None,
                children,
                visits: Cell::new(0),
            }
        }

        fn leaf(label: &'static str, handle: Option<RawSessionHandle>) -> Self {
            Self {
                label,
                handle,
                children: Vec::new(),
                visits: Cell::new(0),
            }
        }
    }

    impl SessionNode for MockNode {
        fn label(&self) -> &'static str {
            self.label
        }

        fn children(&self) -> Vec<&dyn SessionNode> {
            self.visits.set(self.visits.get() + 1);
            self.children
                .iter()
                .map(|child| child as &dyn SessionNode)
                .collect()
        }

        fn handle(&self) -> Option<RawSessionHandle> {
            self.handle
        }
    }

    fn valid_handle() -> RawSessionHandle {
        RawSessionHandle::new(0xdead_beef_usize as *mut std::ffi::c_void)
    }

    #[test]
    fn finds_handle_behind_layers() {
        let root = MockNode::branch(
            "pqtrace::MaybeTlsStream",
            vec![MockNode::branch(
                "tokio_openssl::SslStream",
                vec![
                    MockNode::leaf("tokio::net::TcpStream", None),
                    MockNode::leaf("openssl::ssl::SslRef", Some(valid_handle())),
                ],
            )],
        );

        let locator = HandleLocator::new();
        let handle = locator.locate(&root).expect("handle");
        assert!(handle.is_valid());
        assert_eq!(locator.cached_path().unwrap().as_ref(), &[0, 1]);
    }

    #[test]
    fn respects_depth_bound() {
        // Handle sits five hops down, one past the bound.
        let mut node = MockNode::leaf("openssl::ssl::SslRef", Some(valid_handle()));
        for _ in 0..5 {
            node = MockNode::branch("pqtrace::Layer", vec![node]);
        }

        let locator = HandleLocator::new();
        assert!(locator.locate(&node).is_none());
        assert!(!locator.has_cached_path());
    }

    #[test]
    fn skips_nodes_outside_session_namespace() {
        let root = MockNode::branch(
            "pqtrace::Root",
            vec![
                MockNode::branch(
                    "alloc::vec::Vec<u8>",
                    vec![MockNode::leaf("openssl::ssl::SslRef", Some(valid_handle()))],
                ),
                MockNode::leaf("openssl::ssl::SslRef", Some(valid_handle())),
            ],
        );

        let locator = HandleLocator::new();
        assert!(locator.locate(&root).is_some());
        // The unrelated branch was never descended into.
        assert_eq!(root.children[0].visits.get(), 0);
        assert_eq!(locator.cached_path().unwrap().as_ref(), &[1]);
    }

    #[test]
    fn rejects_handle_without_marker() {
        let root = MockNode::branch(
            "pqtrace::Root",
            vec![MockNode::leaf(
                "tokio::net::TcpStream",
                Some(valid_handle()),
            )],
        );

        let locator = HandleLocator::new();
        assert!(locator.locate(&root).is_none());
    }

    #[test]
    fn replays_cached_path_without_searching() {
        let decoy = MockNode::branch(
            "pqtrace::DecoyBranch",
            vec![MockNode::leaf("tokio::net::TcpStream", None)],
        );
        let target = MockNode::leaf("openssl::ssl::SslRef", Some(valid_handle()));
        let root = MockNode::branch("pqtrace::Root", vec![decoy, target]);

        let locator = HandleLocator::new();
        assert!(locator.locate(&root).is_some());
        let decoy_visits_after_discovery = root.children[0].visits.get();
        assert!(decoy_visits_after_discovery > 0);

        // Second locate replays [1] directly: the decoy branch is not
        // descended into again.
        assert!(locator.locate(&root).is_some());
        assert_eq!(root.children[0].visits.get(), decoy_visits_after_discovery);
    }

    #[test]
    fn invalid_cached_path_triggers_rediscovery() {
        let old_shape = MockNode::branch(
            "pqtrace::Root",
            vec![
                MockNode::leaf("tokio::net::TcpStream", None),
                MockNode::leaf("openssl::ssl::SslRef", Some(valid_handle())),
            ],
        );
        let locator = HandleLocator::new();
        assert!(locator.locate(&old_shape).is_some());
        assert_eq!(locator.cached_path().unwrap().as_ref(), &[1]);

        // The layering changed: the handle now lives at index 0 and the
        // cached path points at a handle-less node.
        let new_shape = MockNode::branch(
            "pqtrace::Root",
            vec![
                MockNode::leaf("openssl::ssl::SslRef", Some(valid_handle())),
                MockNode::leaf("tokio::net::TcpStream", None),
            ],
        );
        assert!(locator.locate(&new_shape).is_some());
        assert_eq!(locator.cached_path().unwrap().as_ref(), &[0]);
    }

    #[test]
    fn null_handle_is_not_accepted() {
        let root = MockNode::branch(
            "pqtrace::Root",
            vec![MockNode::leaf(
                "openssl::ssl::SslRef",
                Some(RawSessionHandle::new(std::ptr::null_mut())),
            )],
        );

        let locator = HandleLocator::new();
        assert!(locator.locate(&root).is_none());
    }
}
