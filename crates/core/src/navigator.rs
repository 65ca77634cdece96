//! Pure navigation over a value tree
//!
//! Every operation takes the root by value and returns the new root together
//! with the value that used to live at the path. Only the spine along the
//! path is rebuilt; untouched subtrees are moved, not copied.
//!
//! Shape mismatches never fail:
//! - [`get`] collapses any mismatch to `None`
//! - [`set`] and [`merge`] replace a wrongly-shaped step with a container of
//!   the kind the path needs
//! - [`remove`] of a path that does not exist returns the root unchanged

use crate::keypath::{KeyPath, PathComponent};
use crate::value::{Map, Value};

/// Get the value at `path`
///
/// # Examples
///
/// ```
/// use bindstore_core::{navigator, KeyPath, Value};
///
/// let root: Value = r#"{"user": {"scores": [100, 95]}}"#.parse().unwrap();
/// let path: KeyPath = "user.scores[1]".parse().unwrap();
/// assert_eq!(navigator::get(&path, &root), Some(&Value::Int(95)));
///
/// let wrong: KeyPath = "user.scores.first".parse().unwrap();
/// assert_eq!(navigator::get(&wrong, &root), None);
/// ```
pub fn get<'a>(path: &KeyPath, root: &'a Value) -> Option<&'a Value> {
    let mut current = root;
    for component in path.components() {
        current = match (component, current) {
            (PathComponent::Property(name), Value::Object(obj)) => obj.get(name)?,
            (PathComponent::Index(idx), Value::Array(arr)) => arr.get(*idx)?,
            _ => return None,
        };
    }
    Some(current)
}

/// Set `value` at `path`, returning `(new_root, old_value)`
///
/// Missing containers are created with the kind the following component
/// needs (object for a property, array for an index). Arrays are padded
/// with `Null` up to the target index.
///
/// # Examples
///
/// ```
/// use bindstore_core::{navigator, KeyPath, Value};
///
/// let root: Value = r#"{"items": ["a"]}"#.parse().unwrap();
/// let path: KeyPath = "items[3]".parse().unwrap();
/// let (root, old) = navigator::set(&path, Value::from("d"), root);
/// assert_eq!(old, None);
/// assert_eq!(root.to_string(), r#"{"items":["a",null,null,"d"]}"#);
/// ```
pub fn set(path: &KeyPath, value: Value, root: Value) -> (Value, Option<Value>) {
    update_in(Some(root), path.components(), move |old| (value, old))
}

/// Shallow-merge `fragment` into the object at `path`
///
/// If both the current value and `fragment` are objects, the fragment's
/// keys overwrite the existing ones. Otherwise the target becomes exactly
/// `fragment`. Returns `(new_root, value_before_merge)`.
pub fn merge(path: &KeyPath, fragment: Value, root: Value) -> (Value, Option<Value>) {
    update_in(Some(root), path.components(), move |old| match (old, fragment) {
        (Some(Value::Object(existing)), Value::Object(patch)) => {
            let before = Value::Object(existing.clone());
            let mut merged = existing;
            merged.extend(patch);
            (Value::Object(merged), Some(before))
        }
        (old, fragment) => (fragment, old),
    })
}

/// Remove the value at `path`, returning `(new_root, removed_value)`
///
/// Removing an array element shifts later elements down. Removing the
/// root leaves `Null` behind. A path that does not exist is a no-op.
pub fn remove(path: &KeyPath, root: Value) -> (Value, Option<Value>) {
    if path.is_root() {
        return (Value::Null, Some(root));
    }
    remove_in(root, path.components())
}

/// Rebuild the spine along `components`, handing the terminal slot to `f`
fn update_in<F>(node: Option<Value>, components: &[PathComponent], f: F) -> (Value, Option<Value>)
where
    F: FnOnce(Option<Value>) -> (Value, Option<Value>),
{
    let Some((head, rest)) = components.split_first() else {
        return f(node);
    };

    match head {
        PathComponent::Property(name) => {
            let mut obj = match node {
                Some(Value::Object(obj)) => obj,
                _ => Map::new(),
            };
            let child = obj.remove(name);
            let (new_child, old) = update_in(child, rest, f);
            obj.insert(name.clone(), new_child);
            (Value::Object(obj), old)
        }
        PathComponent::Index(idx) => {
            let idx = *idx;
            let mut arr = match node {
                Some(Value::Array(arr)) => arr,
                _ => Vec::new(),
            };
            let child = arr.get_mut(idx).map(std::mem::take);
            let (new_child, old) = update_in(child, rest, f);
            if idx < arr.len() {
                arr[idx] = new_child;
            } else {
                arr.resize(idx, Value::Null);
                arr.push(new_child);
            }
            (Value::Array(arr), old)
        }
    }
}

fn remove_in(node: Value, components: &[PathComponent]) -> (Value, Option<Value>) {
    let Some((head, rest)) = components.split_first() else {
        return (node, None);
    };

    match (head, node) {
        (PathComponent::Property(name), Value::Object(mut obj)) => {
            if rest.is_empty() {
                let removed = obj.remove(name);
                return (Value::Object(obj), removed);
            }
            let removed = match obj.remove(name) {
                Some(child) => {
                    let (new_child, removed) = remove_in(child, rest);
                    obj.insert(name.clone(), new_child);
                    removed
                }
                None => None,
            };
            (Value::Object(obj), removed)
        }
        (PathComponent::Index(idx), Value::Array(mut arr)) => {
            let idx = *idx;
            if idx >= arr.len() {
                return (Value::Array(arr), None);
            }
            if rest.is_empty() {
                let removed = arr.remove(idx);
                return (Value::Array(arr), Some(removed));
            }
            let child = std::mem::take(&mut arr[idx]);
            let (new_child, removed) = remove_in(child, rest);
            arr[idx] = new_child;
            (Value::Array(arr), removed)
        }
        (_, node) => (node, None),
    }
}
