//! Small helpers over `roxmltree` nodes
//!
//! OOXML elements and attributes live in the `w:` namespace; matching on
//! local names keeps the walkers independent of the prefix a producer chose.

use roxmltree::Node;

/// True when the node is an element with the given local name.
#[inline]
pub(crate) fn is_elem(node: Node<'_, '_>, name: &str) -> bool {
    node.is_element() && node.tag_name().name() == name
}

/// First child element with the given local name.
#[inline]
pub(crate) fn child<'a, 'input>(
    node: Node<'a, 'input>,
    name: &str,
) -> Option<Node<'a, 'input>> {
    node.children().find(|n| is_elem(*n, name))
}

/// Attribute value looked up by local name.
#[inline]
pub(crate) fn attr<'a>(node: Node<'a, '_>, name: &str) -> Option<&'a str> {
    node.attributes()
        .find(|a| a.name() == name)
        .map(|a| a.value())
}

/// Attribute value parsed as an integer; `None` when absent or malformed.
#[inline]
pub(crate) fn attr_i64(node: Node<'_, '_>, name: &str) -> Option<i64> {
    attr(node, name).and_then(|v| v.parse().ok())
}

/// Attribute value parsed as a usize; `None` when absent or malformed.
#[inline]
pub(crate) fn attr_usize(node: Node<'_, '_>, name: &str) -> Option<usize> {
    attr(node, name).and_then(|v| v.parse().ok())
}
