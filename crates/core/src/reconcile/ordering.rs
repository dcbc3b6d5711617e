//! Ordering of desired items according to `collection_order`.

use std::cmp::Ordering;

use crate::collection::CollectionOrder;
use crate::inventory::InventoryItem;
use crate::matcher::normalize_title;

/// Stable sort of `items`. `Custom` keeps source order; items missing the
/// sort field go last.
pub fn order_items(mut items: Vec<InventoryItem>, order: CollectionOrder) -> Vec<InventoryItem> {
    match order {
        CollectionOrder::Custom => {}
        CollectionOrder::SortName => items.sort_by_cached_key(|i| {
            normalize_title(i.sort_name.as_deref().unwrap_or(&i.title))
        }),
        CollectionOrder::ReleaseDate => {
            items.sort_by(|a, b| newest_first(a.premiere_date, b.premiere_date))
        }
        CollectionOrder::DateAdded => {
            items.sort_by(|a, b| newest_first(a.date_created, b.date_created))
        }
        CollectionOrder::CommunityRating => {
            items.sort_by(|a, b| highest_first(a.community_rating, b.community_rating))
        }
        CollectionOrder::CriticRating => {
            items.sort_by(|a, b| highest_first(a.critic_rating, b.critic_rating))
        }
    }
    items
}

fn newest_first<T: Ord>(a: Option<T>, b: Option<T>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => b.cmp(&a),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

fn highest_first(a: Option<f32>, b: Option<f32>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => b.total_cmp(&a),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}
