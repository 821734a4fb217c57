use crate::platform;

/// OS-level id of the calling thread.
///
/// Stable for the lifetime of the thread and distinct among threads that are
/// alive at the same time in this process. Ids may be reused once a thread
/// exits. Intended as a cheap ownership tag, e.g. to detect a single-writer
/// protocol being driven from two threads.
///
/// Linux and Android return the kernel `gettid`, macOS the
/// `pthread_threadid_np` value, Windows `GetCurrentThreadId`.
#[inline]
pub fn current_thread_id() -> u64 {
    platform::current_thread_id()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Barrier};
    use std::thread;

    #[test]
    fn test_thread_id_stable_on_one_thread() {
        let first = current_thread_id();
        for _ in 0..100 {
            assert_eq!(current_thread_id(), first, "Thread id must not change");
        }
    }

    #[test]
    fn test_concurrent_threads_have_distinct_ids() {
        const THREADS: usize = 8;
        let barrier = Arc::new(Barrier::new(THREADS));

        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    let id = current_thread_id();
                    // Keep every thread alive until all ids are taken
                    barrier.wait();
                    id
                })
            })
            .collect();

        let mut ids: Vec<u64> = handles
            .into_iter()
            .map(|h| h.join().expect("Thread panicked"))
            .collect();
        ids.sort_unstable();
        ids.dedup();

        assert_eq!(ids.len(), THREADS, "Live threads must have unique ids");
    }

    #[test]
    fn test_spawned_thread_differs_from_caller() {
        let main_id = current_thread_id();
        let child_id = thread::spawn(current_thread_id).join().unwrap();
        assert_ne!(main_id, child_id);
    }
}
