//! Concurrency tests for the time-series store
//!
//! These exercise concurrent writers to distinct and shared series and
//! readers running alongside them.

use super::*;
use std::collections::HashMap;
use std::sync::Arc;
use std::thread;

#[test]
fn test_concurrent_writers_to_distinct_series() {
    let store = Arc::new(TimeSeriesStore::new());

    let handles: Vec<_> = (0..4)
        .map(|w| {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                let entity = format!("service{}", w);
                for i in 0..100 {
                    store.append(&entity, "request_count", i as f64, HashMap::new());
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(store.series_count(), 4);
    for w in 0..4 {
        let series = store.get(&format!("service{}", w), "request_count").unwrap();
        assert_eq!(series.len(), 100);
        // single writer per series keeps insertion order
        let values: Vec<f64> = series.points.iter().map(|p| p.value).collect();
        let expected: Vec<f64> = (0..100).map(|i| i as f64).collect();
        assert_eq!(values, expected);
    }
}

#[test]
fn test_concurrent_writers_to_same_series() {
    let store = Arc::new(TimeSeriesStore::new());

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                for i in 0..250 {
                    store.append("shared", "error_rate", i as f64, HashMap::new());
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(store.series_count(), 1);
    assert_eq!(store.len_of("shared", "error_rate"), 8 * 250);
}

#[test]
fn test_readers_see_consistent_snapshots() {
    let store = Arc::new(TimeSeriesStore::new());

    let writer = {
        let store = Arc::clone(&store);
        thread::spawn(move || {
            for i in 0..500 {
                store.append("svc", "metric", i as f64, HashMap::new());
            }
        })
    };

    let reader = {
        let store = Arc::clone(&store);
        thread::spawn(move || {
            for _ in 0..200 {
                let latest = store.latest_n("svc", "metric", 10);
                assert!(latest.len() <= 10);
                // a snapshot is always a contiguous increasing run
                for pair in latest.windows(2) {
                    assert_eq!(pair[1].value, pair[0].value + 1.0);
                }
            }
        })
    };

    writer.join().unwrap();
    reader.join().unwrap();
    assert_eq!(store.len_of("svc", "metric"), 500);
}
