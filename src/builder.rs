//! `h`: the convenience constructor for abstract trees.
use crate::types::{SelectorParts, COMMENT_SELECTOR};
use crate::vnode::{Content, VNode, VNodeData};

pub const SVG_NAMESPACE: &str = "http://www.w3.org/2000/svg";

/// One entry of a mixed children list. Bare text is wrapped into a text leaf.
#[derive(Debug, Clone)]
pub enum Child<N> {
    Node(VNode<N>),
    Text(String),
}

impl<N> From<Child<N>> for VNode<N> {
    fn from(child: Child<N>) -> Self {
        match child {
            Child::Node(node) => node,
            Child::Text(text) => VNode::text(text),
        }
    }
}

impl<N> From<VNode<N>> for Child<N> {
    fn from(node: VNode<N>) -> Self {
        Child::Node(node)
    }
}

impl<N> From<&str> for Child<N> {
    fn from(text: &str) -> Self {
        Child::Text(text.to_string())
    }
}

impl<N> From<String> for Child<N> {
    fn from(text: String) -> Self {
        Child::Text(text)
    }
}

/// Children argument of `h`: nothing, a single text, or a list of nodes.
#[derive(Debug, Clone)]
pub enum Children<N> {
    None,
    Text(String),
    Nodes(Vec<VNode<N>>),
}

impl<N> From<()> for Children<N> {
    fn from(_: ()) -> Self {
        Children::None
    }
}

impl<N> From<&str> for Children<N> {
    fn from(text: &str) -> Self {
        Children::Text(text.to_string())
    }
}

impl<N> From<String> for Children<N> {
    fn from(text: String) -> Self {
        Children::Text(text)
    }
}

impl<N> From<VNode<N>> for Children<N> {
    fn from(node: VNode<N>) -> Self {
        Children::Nodes(vec![node])
    }
}

impl<N> From<Vec<VNode<N>>> for Children<N> {
    fn from(nodes: Vec<VNode<N>>) -> Self {
        Children::Nodes(nodes)
    }
}

impl<N> From<Vec<Child<N>>> for Children<N> {
    fn from(children: Vec<Child<N>>) -> Self {
        Children::Nodes(children.into_iter().map(VNode::from).collect())
    }
}

macro_rules! numeric_text {
    ($($ty:ty),*) => {
        $(
            impl<N> From<$ty> for Children<N> {
                fn from(value: $ty) -> Self {
                    Children::Text(value.to_string())
                }
            }

            impl<N> From<$ty> for Child<N> {
                fn from(value: $ty) -> Self {
                    Child::Text(value.to_string())
                }
            }
        )*
    };
}

numeric_text!(i32, i64, u32, u64, usize, f64);

/// Build a node from a selector, a property bag and children.
///
/// The selector `"!"` produces a comment whose text is the children text. An
/// `svg` selector puts the whole subtree in the SVG namespace, stopping below
/// `foreignObject`.
pub fn h<N>(sel: &str, data: impl Into<VNodeData<N>>, children: impl Into<Children<N>>) -> VNode<N> {
    let data = data.into();
    let children = children.into();

    if sel == COMMENT_SELECTOR {
        let text = match children {
            Children::Text(text) => text,
            _ => String::new(),
        };
        return VNode::comment(text, data);
    }

    let content = match children {
        Children::None => Content::Empty,
        Children::Text(text) => Content::Text(text),
        Children::Nodes(nodes) => Content::Children(nodes),
    };
    let mut node = VNode::element(sel, data, content);
    if is_svg(sel) {
        add_ns(&mut node);
    }
    node
}

/// Text leaf.
pub fn text<N>(text: impl Into<String>) -> VNode<N> {
    VNode::text(text)
}

/// Comment without a property bag.
pub fn comment<N>(text: impl Into<String>) -> VNode<N> {
    VNode::comment(text, VNodeData::default())
}

fn is_svg(sel: &str) -> bool {
    sel.strip_prefix("svg")
        .is_some_and(|rest| rest.is_empty() || rest.starts_with(['.', '#']))
}

fn add_ns<N>(node: &mut VNode<N>) {
    match node {
        VNode::Element(el) => {
            el.data.ns = Some(SVG_NAMESPACE.to_string());
            if SelectorParts::parse(&el.sel).tag == "foreignObject" {
                return;
            }
            if let Content::Children(children) = &mut el.content {
                children.iter_mut().for_each(add_ns);
            }
        }
        VNode::Comment(comment) => comment.data.ns = Some(SVG_NAMESPACE.to_string()),
        VNode::Text(_) => {}
    }
}
