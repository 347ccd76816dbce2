use std::thread;

/// Computes `f(0), f(1), ..., f(len - 1)` on up to `threads` scoped workers.
///
/// Worker `w` always handles the same contiguous block of indices, and each result lands
/// in the slot of its index, so the output does not depend on the thread count.
pub(crate) fn map_indexed<T, F>(len: usize, threads: usize, f: F) -> Vec<T>
where
    T: Send,
    F: Fn(usize) -> T + Sync,
{
    let threads = threads.clamp(1, len.max(1));
    if threads == 1 {
        return (0..len).map(f).collect();
    }

    let chunk_len = len.div_ceil(threads);
    let mut slots = (0..len).map(|_| None).collect::<Vec<Option<T>>>();
    thread::scope(|s| {
        let f = &f;
        for (chunk, slots) in slots.chunks_mut(chunk_len).enumerate() {
            s.spawn(move || {
                for (offset, slot) in slots.iter_mut().enumerate() {
                    *slot = Some(f(chunk * chunk_len + offset));
                }
            });
        }
    });
    slots.into_iter().flatten().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_results_in_index_order() {
        let expected = (0..23).map(|i| i * i).collect::<Vec<_>>();
        for threads in [1, 2, 4, 7, 64] {
            assert_eq!(map_indexed(23, threads, |i| i * i), expected);
        }
        assert!(map_indexed(0, 4, |i| i).is_empty());
    }
}
