//! Dense re-labelling of ordered lists after a move.
//!
//! Shared by the optimistic cache update and the server-side reorder handler
//! so both sides agree on where a moved item lands.

/// An item with a display position.
pub trait Ordered: Clone {
  fn key(&self) -> &str;
  fn set_order(&mut self, order: i64);
}

/// Move the item identified by `key` and re-label every item `0..n-1`.
///
/// `from` and `to` are the positions the caller saw. When moving up
/// (`to < from`) the item is inserted at `to`; otherwise the target is
/// clamped to the list length after removal so moving past the tail lands
/// at the end.
///
/// Returns `None` when `key` is not in the list.
pub fn reorder<T: Ordered>(items: &[T], key: &str, from: usize, to: usize) -> Option<Vec<T>> {
  let current = items.iter().position(|item| item.key() == key)?;

  let mut items = items.to_vec();
  let moved = items.remove(current);

  let index = if to < from { to } else { to.min(items.len()) };
  // `from` may not match the item's real index if the list moved underneath
  items.insert(index.min(items.len()), moved);

  relabel(&mut items);
  Some(items)
}

/// Assign dense zero-based order values in list order.
pub fn relabel<T: Ordered>(items: &mut [T]) {
  for (index, item) in items.iter_mut().enumerate() {
    item.set_order(index as i64);
  }
}
