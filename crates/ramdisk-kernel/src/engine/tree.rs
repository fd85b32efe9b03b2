//! Namespace tree: path handling and structural edits.
//!
//! Paths here are canonical: absolute, `/`-separated, no empty, `.` or `..`
//! components, no trailing separator. [`canonicalize`] turns caller input
//! into that form; everything else assumes it.

use super::node::{Node, NodeBody};
use crate::vfs::{VfsError, VfsResult};

/// Longest accepted path component, in bytes.
pub const NAME_MAX: usize = 255;

/// Longest accepted canonical path, in bytes.
pub const PATH_MAX: usize = 4096;

/// Normalize caller input into a canonical path.
///
/// Repeated and trailing separators collapse, `.` is dropped, `..` pops one
/// component (stopping at the root) and a missing leading `/` is implied.
pub fn canonicalize(path: &str) -> VfsResult<String> {
    if path.contains('\0') {
        return Err(VfsError::invalid_path(path.replace('\0', "\\0")));
    }

    let mut parts: Vec<&str> = Vec::new();
    for component in path.split('/') {
        match component {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            name if name.len() > NAME_MAX => return Err(VfsError::name_too_long(path)),
            name => parts.push(name),
        }
    }

    let canonical = if parts.is_empty() {
        "/".to_string()
    } else {
        format!("/{}", parts.join("/"))
    };
    if canonical.len() > PATH_MAX {
        return Err(VfsError::name_too_long(path));
    }
    Ok(canonical)
}

/// [`canonicalize`], with every `..` checked against the tree.
///
/// A `..` only steps back out of a directory that exists, so `/file/../x`
/// fails with `NotADirectory` and `/missing/../x` with `NotFound`, as they
/// would on a kernel-walked path.
pub fn canonicalize_in(root: &Node, path: &str) -> VfsResult<String> {
    let canonical = canonicalize(path)?;
    if path.split('/').any(|c| c == "..") {
        check_parent_steps(root, path)?;
    }
    Ok(canonical)
}

fn check_parent_steps(root: &Node, path: &str) -> VfsResult<()> {
    // `None` marks a component that does not exist.
    let mut walked: Vec<Option<&Node>> = vec![Some(root)];
    for component in path.split('/') {
        match component {
            "" | "." => {}
            ".." => {
                match walked.last().copied().flatten() {
                    Some(node) if node.is_dir() => {}
                    Some(_) => return Err(VfsError::not_a_directory(path)),
                    None => return Err(VfsError::not_found(path)),
                }
                if walked.len() > 1 {
                    walked.pop();
                }
            }
            name => {
                let next = match walked.last().copied().flatten() {
                    Some(node) if !node.is_dir() => {
                        return Err(VfsError::not_a_directory(path));
                    }
                    Some(node) => node.child(name),
                    None => None,
                };
                walked.push(next);
            }
        }
    }
    Ok(())
}

/// Parent path. The root is its own parent.
pub fn dirname(path: &str) -> &str {
    match path.rfind('/') {
        Some(0) | None => "/",
        Some(idx) => &path[..idx],
    }
}

/// Final component. The root's is `/`.
pub fn basename(path: &str) -> &str {
    if path == "/" {
        return path;
    }
    match path.rfind('/') {
        Some(idx) => &path[idx + 1..],
        None => path,
    }
}

/// Child path of `parent` named `name`.
pub fn join(parent: &str, name: &str) -> String {
    if parent == "/" {
        format!("/{name}")
    } else {
        format!("{parent}/{name}")
    }
}

/// True if `path` lies strictly below `ancestor`.
pub fn is_descendant(path: &str, ancestor: &str) -> bool {
    if ancestor == "/" {
        return path != "/";
    }
    path.strip_prefix(ancestor)
        .is_some_and(|rest| rest.starts_with('/'))
}

fn components(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|c| !c.is_empty())
}

/// Find the node at `path`, one component at a time from `root`.
pub fn resolve<'a>(root: &'a Node, path: &str) -> Option<&'a Node> {
    let mut node = root;
    for name in components(path) {
        node = node.child(name)?;
    }
    Some(node)
}

/// Mutable [`resolve`].
pub fn resolve_mut<'a>(root: &'a mut Node, path: &str) -> Option<&'a mut Node> {
    let mut node = root;
    for name in components(path) {
        node = node.child_mut(name)?;
    }
    Some(node)
}

/// Append `node` to `parent`'s children, after any existing ones.
///
/// The caller has already checked that the name is free.
pub fn insert(parent: &mut Node, node: Node) {
    debug_assert_eq!(dirname(&node.path), parent.path);
    debug_assert!(parent.child(node.name()).is_none(), "duplicate path {}", node.path);

    match &mut parent.body {
        NodeBody::Directory { children } => children.push(node),
        NodeBody::File { .. } => {
            panic!("insert into non-directory {}", parent.path)
        }
    }
}

/// Detach the child called `name`, keeping the order of the rest.
pub fn remove(parent: &mut Node, name: &str) -> Option<Node> {
    match &mut parent.body {
        NodeBody::Directory { children } => {
            let idx = children.iter().position(|c| c.name() == name)?;
            Some(children.remove(idx))
        }
        NodeBody::File { .. } => None,
    }
}

/// Give `node` a new path and carry every descendant along with it.
pub fn rebase(node: &mut Node, new_path: String) {
    node.path = new_path;
    if let NodeBody::Directory { children } = &mut node.body {
        for child in children {
            let path = join(&node.path, child.name());
            rebase(child, path);
        }
    }
}
