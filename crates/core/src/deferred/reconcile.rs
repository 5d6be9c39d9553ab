//! Merge of a round's leftovers with items that arrived during the round

use tracing::trace;

use super::item::DeferredItem;

/// Combine `not_sent` with `incoming`.
///
/// A `not_sent` entry whose key shows up in `incoming` is replaced in place
/// by the incoming item, which is then taken out of `incoming`. The result
/// is the (possibly replaced) `not_sent` batch followed by whatever is left
/// of `incoming`, in arrival order.
pub fn merge<C>(
    mut not_sent: Vec<DeferredItem<C>>,
    mut incoming: Vec<DeferredItem<C>>,
) -> Vec<DeferredItem<C>> {
    if !incoming.is_empty() {
        for slot in &mut not_sent {
            if let Some(pos) = incoming.iter().position(|item| item.key == slot.key) {
                trace!(key = %slot.key, "superseding unsent item with newer update");
                *slot = incoming.remove(pos);
            }
        }
    }
    not_sent.append(&mut incoming);
    not_sent
}
