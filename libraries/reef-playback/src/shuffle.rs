//! Queue-order transforms
//!
//! Pure functions deciding where incoming tracks land in the actual queue
//! and which natural-order tags they carry. The controller applies the
//! results to the live player; nothing here touches player state.

use crate::types::QueueItem;
use rand::seq::SliceRandom;
use rand::thread_rng;
use reef_core::Track;

/// Transform for replacing the whole queue
///
/// Returns the items to load and the index to start playback at.
///
/// With shuffle off the tracks load untagged in the given order and playback
/// starts at the requested index (or 0). With shuffle on, the requested
/// track is placed first and the rest are drawn randomly behind it; each
/// item is tagged with its position in the caller-supplied sequence, which
/// becomes the new natural order. The start index is then always 0.
pub fn prepare_set(
    shuffle: bool,
    tracks: Vec<Track>,
    start_index: Option<usize>,
) -> (Vec<QueueItem>, usize) {
    let start_index = start_index.filter(|&i| i < tracks.len());

    if !shuffle {
        let start = start_index.unwrap_or(0);
        (tracks.into_iter().map(QueueItem::new).collect(), start)
    } else {
        let mut rest: Vec<usize> = (0..tracks.len())
            .filter(|&i| Some(i) != start_index)
            .collect();
        rest.shuffle(&mut thread_rng());

        let order = start_index.into_iter().chain(rest);
        let mut slots: Vec<Option<Track>> = tracks.into_iter().map(Some).collect();
        let items = order
            .filter_map(|i| slots[i].take().map(|track| QueueItem::tagged(track, i)))
            .collect();
        (items, 0)
    }
}

/// Transform for appending tracks to the queue
///
/// `queue_len` is the queue length before the append. With shuffle off the
/// tracks stay untagged; with shuffle on they are tagged past the end of
/// the natural order, so they play "later" logically no matter where a
/// native player slots them.
pub fn prepare_append(shuffle: bool, queue_len: usize, tracks: Vec<Track>) -> Vec<QueueItem> {
    tracks
        .into_iter()
        .enumerate()
        .map(|(i, track)| {
            if shuffle {
                QueueItem::tagged(track, queue_len + i)
            } else {
                QueueItem::new(track)
            }
        })
        .collect()
}

/// Tags for tracks spliced in right after the current entry
///
/// `current_tag` is the current entry's natural-order tag. The new items
/// take the next `count` natural slots; [`bumped_tag`] shifts existing
/// entries out of the way first.
pub fn insert_tags(current_tag: usize, count: usize) -> impl Iterator<Item = usize> {
    (1..=count).map(move |i| current_tag + i)
}

/// New tag for an existing entry when `count` tracks are inserted after the
/// entry tagged `current_tag`; tags at or below the current one are untouched
pub fn bumped_tag(tag: usize, current_tag: usize, count: usize) -> usize {
    if tag > current_tag {
        tag + count
    } else {
        tag
    }
}
