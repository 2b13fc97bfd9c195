//! Bounded worker pool over scoped threads.

use std::sync::{Mutex, PoisonError};
use std::thread;

/// Run `job` over `items` on at most `workers` threads.
///
/// Results come back in input order. Items are handed out one at a time, so
/// a slow item never holds up the rest of the queue. A panicking job
/// propagates once every worker has stopped.
///
/// # Examples
///
/// ```
/// use upkern_installer::pool::run_bounded;
///
/// let squares = run_bounded(vec![1, 2, 3, 4], 2, |n| n * n);
/// assert_eq!(squares, vec![1, 4, 9, 16]);
/// ```
pub fn run_bounded<T, R, F>(items: Vec<T>, workers: usize, job: F) -> Vec<R>
where
    T: Send,
    R: Send,
    F: Fn(T) -> R + Sync,
{
    let total = items.len();
    let worker_count = workers.clamp(1, total.max(1));
    let queue = Mutex::new(items.into_iter().enumerate());
    let finished = Mutex::new(Vec::with_capacity(total));

    thread::scope(|scope| {
        for _ in 0..worker_count {
            scope.spawn(|| {
                loop {
                    let next = queue
                        .lock()
                        .unwrap_or_else(PoisonError::into_inner)
                        .next();
                    let Some((index, item)) = next else {
                        break;
                    };
                    let output = job(item);
                    finished
                        .lock()
                        .unwrap_or_else(PoisonError::into_inner)
                        .push((index, output));
                }
            });
        }
    });

    let mut finished = finished
        .into_inner()
        .unwrap_or_else(PoisonError::into_inner);
    finished.sort_by_key(|(index, _)| *index);
    finished.into_iter().map(|(_, output)| output).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[rstest]
    #[case::single_worker(1)]
    #[case::fewer_workers_than_items(3)]
    #[case::more_workers_than_items(64)]
    #[case::zero_is_treated_as_one(0)]
    fn preserves_input_order(#[case] workers: usize) {
        let items: Vec<u64> = (0..20).collect();
        let output = run_bounded(items.clone(), workers, |n| {
            thread::sleep(Duration::from_millis(20 - n));
            n * 2
        });
        let expected: Vec<u64> = items.iter().map(|n| n * 2).collect();
        assert_eq!(output, expected);
    }

    #[test]
    fn never_exceeds_the_worker_limit() {
        let active = AtomicUsize::new(0);
        let peak = AtomicUsize::new(0);
        run_bounded((0..16).collect(), 3, |_: i32| {
            let now = active.fetch_add(1, Ordering::SeqCst) + 1;
            peak.fetch_max(now, Ordering::SeqCst);
            thread::sleep(Duration::from_millis(10));
            active.fetch_sub(1, Ordering::SeqCst);
        });
        assert!(peak.load(Ordering::SeqCst) <= 3);
    }

    #[test]
    fn empty_input_yields_empty_output() {
        let output: Vec<i32> = run_bounded(Vec::<i32>::new(), 4, |n| n);
        assert!(output.is_empty());
    }
}
