//! Prefix tree of route patterns.
//!
//! One tree per HTTP method. Each node stands for one `/`-delimited segment
//! of a registered pattern:
//!
//! ```text
//! (root)
//! ├── hello
//! │   └── :name          ← pattern "/hello/:name"
//! └── assets
//!     └── *filepath      ← pattern "/assets/*filepath"
//! ```
//!
//! # Matching order
//!
//! At every depth, children whose segment equals the request segment are
//! tried before wild children (`:name`, `*name`), and each class is tried in
//! registration order. `/users/new` therefore beats `/users/:id` no matter
//! which one was registered first.

/// Splits a pattern or request path into its segments.
///
/// Empty segments are dropped, so `/a//b/` yields `["a", "b"]`. Collection
/// stops after the first wildcard segment: `/a/*rest/b` yields `["a", "*rest"]`.
pub(crate) fn parse_pattern(pattern: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    for item in pattern.split('/') {
        if item.is_empty() {
            continue;
        }
        parts.push(item);
        if item.starts_with('*') {
            break;
        }
    }
    parts
}

fn is_wild(part: &str) -> bool {
    part.starts_with(':') || part.starts_with('*')
}

/// Two segments occupy the same slot when they are equal, or when both are
/// wild of the same kind. Parameter names do not matter: `:id` and `:name`
/// share one node.
fn same_slot(existing: &str, part: &str) -> bool {
    existing == part || (is_wild(existing) && is_wild(part) && existing[..1] == part[..1])
}

/// Outcome of checking a new pattern against the patterns already in a tree.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum Judgement<'a> {
    /// No existing route is affected.
    Fresh,
    /// The new pattern sits next to a sibling of the other kind (static vs
    /// wild) at some depth. Both stay reachable; static wins at match time.
    Overlap(&'a str),
    /// An equivalent pattern already terminates here.
    Duplicate(&'a str),
}

/// A node of the route tree.
#[derive(Debug, Default)]
pub(crate) struct Node {
    /// Full pattern terminated by this node, empty for internal nodes.
    pattern: String,
    /// Segment text this node stands for, empty at the root.
    part: String,
    /// Children in insertion order.
    children: Vec<Node>,
    /// `part` starts with `:` or `*`.
    is_wild: bool,
}

impl Node {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Index of the child a new segment descends into, if one exists.
    fn child_for_insert(&self, part: &str) -> Option<usize> {
        self.children
            .iter()
            .position(|child| child.part == part)
            .or_else(|| {
                self.children
                    .iter()
                    .position(|child| child.is_wild && same_slot(&child.part, part))
            })
    }

    /// Inserts `pattern`, whose segments are `parts`, below this node.
    /// `height` is the depth of `self`.
    pub(crate) fn insert(&mut self, pattern: &str, parts: &[&str], height: usize) {
        if parts.len() == height {
            self.pattern = pattern.to_owned();
            return;
        }

        let part = parts[height];
        let index = match self.child_for_insert(part) {
            Some(index) => index,
            None => {
                self.children.push(Node {
                    part: part.to_owned(),
                    is_wild: is_wild(part),
                    ..Node::default()
                });
                self.children.len() - 1
            }
        };
        self.children[index].insert(pattern, parts, height + 1);
    }

    /// Finds the terminal node matching the request segments `parts`.
    pub(crate) fn search(&self, parts: &[&str], height: usize) -> Option<&Node> {
        if parts.len() == height || self.part.starts_with('*') {
            return (!self.pattern.is_empty()).then_some(self);
        }

        let part = parts[height];
        let statics = self.children.iter().filter(|child| !child.is_wild && child.part == part);
        let wilds = self.children.iter().filter(|child| child.is_wild);

        statics
            .chain(wilds)
            .find_map(|child| child.search(parts, height + 1))
    }

    /// Checks `parts` against the existing tree before it is inserted.
    pub(crate) fn judge(&self, parts: &[&str], height: usize) -> Judgement<'_> {
        if parts.len() == height {
            return if self.pattern.is_empty() {
                Judgement::Fresh
            } else {
                Judgement::Duplicate(&self.pattern)
            };
        }

        let part = parts[height];
        let mut overlap = None;

        for child in &self.children {
            if same_slot(&child.part, part) {
                match child.judge(parts, height + 1) {
                    Judgement::Duplicate(existing) => return Judgement::Duplicate(existing),
                    Judgement::Overlap(with) => overlap = overlap.or(Some(with)),
                    Judgement::Fresh => {}
                }
            } else if child.is_wild != is_wild(part) {
                overlap = overlap.or(Some(child.part.as_str()));
            }
        }

        overlap.map_or(Judgement::Fresh, Judgement::Overlap)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree(patterns: &[&str]) -> Node {
        let mut root = Node::new();
        for pattern in patterns {
            root.insert(pattern, &parse_pattern(pattern), 0);
        }
        root
    }

    fn find<'a>(root: &'a Node, path: &str) -> Option<&'a str> {
        root.search(&parse_pattern(path), 0).map(Node::pattern)
    }

    #[test]
    fn parse_pattern_drops_empty_segments() {
        assert_eq!(parse_pattern("/"), Vec::<&str>::new());
        assert_eq!(parse_pattern("/p/:name"), vec!["p", ":name"]);
        assert_eq!(parse_pattern("//a///b/"), vec!["a", "b"]);
    }

    #[test]
    fn parse_pattern_stops_after_wildcard() {
        assert_eq!(parse_pattern("/p/*"), vec!["p", "*"]);
        assert_eq!(parse_pattern("/p/*name/*"), vec!["p", "*name"]);
        assert_eq!(parse_pattern("/assets/*filepath/ignored"), vec!["assets", "*filepath"]);
    }

    #[test]
    fn search_returns_registered_patterns() {
        let root = tree(&["/", "/hello", "/hello/:name", "/hello/b/c", "/assets/*filepath"]);

        assert_eq!(find(&root, "/"), Some("/"));
        assert_eq!(find(&root, "/hello"), Some("/hello"));
        assert_eq!(find(&root, "/hello/cob"), Some("/hello/:name"));
        assert_eq!(find(&root, "/hello/b/c"), Some("/hello/b/c"));
        assert_eq!(find(&root, "/assets/css/site.css"), Some("/assets/*filepath"));
    }

    #[test]
    fn internal_nodes_do_not_match() {
        let root = tree(&["/hello/b/c"]);
        assert_eq!(find(&root, "/hello"), None);
        assert_eq!(find(&root, "/hello/b"), None);
        assert_eq!(find(&root, "/hello/b/c/d"), None);
    }

    #[test]
    fn wildcard_needs_at_least_one_segment() {
        let root = tree(&["/assets/*filepath"]);
        assert_eq!(find(&root, "/assets"), None);
        assert_eq!(find(&root, "/assets/"), None);
        assert_eq!(find(&root, "/assets/a"), Some("/assets/*filepath"));
    }

    #[test]
    fn static_beats_wild_regardless_of_order() {
        let wild_first = tree(&["/users/:id", "/users/new"]);
        assert_eq!(find(&wild_first, "/users/new"), Some("/users/new"));
        assert_eq!(find(&wild_first, "/users/42"), Some("/users/:id"));

        let static_first = tree(&["/users/new", "/users/:id"]);
        assert_eq!(find(&static_first, "/users/new"), Some("/users/new"));
        assert_eq!(find(&static_first, "/users/42"), Some("/users/:id"));
    }

    #[test]
    fn search_backtracks_out_of_dead_static_branch() {
        let root = tree(&["/a/b/c", "/a/:x/d"]);
        assert_eq!(find(&root, "/a/b/d"), Some("/a/:x/d"));
        assert_eq!(find(&root, "/a/b/c"), Some("/a/b/c"));
    }

    #[test]
    fn wild_segments_of_one_kind_share_a_node() {
        let root = tree(&["/u/:id/a", "/u/:name/b"]);
        assert_eq!(root.children.len(), 1);
        assert_eq!(root.children[0].children.len(), 1);
        assert_eq!(find(&root, "/u/7/a"), Some("/u/:id/a"));
        assert_eq!(find(&root, "/u/7/b"), Some("/u/:name/b"));
    }

    #[test]
    fn judge_reports_duplicates_by_shape() {
        let root = tree(&["/u/:id", "/assets/*filepath"]);
        assert_eq!(root.judge(&parse_pattern("/u/:id"), 0), Judgement::Duplicate("/u/:id"));
        assert_eq!(root.judge(&parse_pattern("/u/:name"), 0), Judgement::Duplicate("/u/:id"));
        assert_eq!(
            root.judge(&parse_pattern("/assets/*rest"), 0),
            Judgement::Duplicate("/assets/*filepath")
        );
    }

    #[test]
    fn judge_reports_overlap_between_static_and_wild() {
        let root = tree(&["/a/:x"]);
        assert_eq!(root.judge(&parse_pattern("/a/b"), 0), Judgement::Overlap(":x"));

        let root = tree(&["/a/b"]);
        assert_eq!(root.judge(&parse_pattern("/a/:x"), 0), Judgement::Overlap("b"));
    }

    #[test]
    fn judge_accepts_new_branches() {
        let root = tree(&["/a/b/c"]);
        assert_eq!(root.judge(&parse_pattern("/a/b"), 0), Judgement::Fresh);
        assert_eq!(root.judge(&parse_pattern("/a/b/d"), 0), Judgement::Fresh);
        assert_eq!(root.judge(&parse_pattern("/x"), 0), Judgement::Fresh);
    }
}
