//! Integration tests for the dispatch queue.

use std::thread;

use cardlink_tick::{DrainReport, dispatch_queue};

// =========================================================================
// Ordering
// =========================================================================

#[test]
fn test_drain_preserves_producer_order() {
    let (tx, mut rx) = dispatch_queue::<u32>("test");
    for i in 0..100 {
        assert!(tx.enqueue(i));
    }

    let mut seen = Vec::new();
    let report = rx.drain(|n| {
        seen.push(n);
        Ok::<_, String>(())
    });

    assert_eq!(seen, (0..100).collect::<Vec<_>>());
    assert_eq!(report, DrainReport { handled: 100, failed: 0 });
    assert!(rx.is_empty());
}

#[test]
fn test_each_producer_is_fifo_across_threads() {
    let (tx, mut rx) = dispatch_queue::<(u8, u32)>("test");

    let handles: Vec<_> = (0..4u8)
        .map(|producer| {
            let tx = tx.clone();
            thread::spawn(move || {
                for seq in 0..250 {
                    tx.enqueue((producer, seq));
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }

    let mut last = [None::<u32>; 4];
    let report = rx.drain(|(producer, seq)| {
        let slot = &mut last[producer as usize];
        if let Some(prev) = *slot {
            assert!(seq > prev, "producer {producer} out of order");
        }
        *slot = Some(seq);
        Ok::<_, String>(())
    });

    assert_eq!(report.handled, 1000);
    assert!(last.iter().all(|s| *s == Some(249)));
}

// =========================================================================
// Failure isolation
// =========================================================================

#[test]
fn test_err_handler_does_not_stop_drain() {
    let (tx, mut rx) = dispatch_queue::<u32>("test");
    for i in 0..5 {
        tx.enqueue(i);
    }

    let mut seen = Vec::new();
    let report = rx.drain(|n| {
        seen.push(n);
        if n == 2 { Err("boom") } else { Ok(()) }
    });

    assert_eq!(seen, vec![0, 1, 2, 3, 4]);
    assert_eq!(report, DrainReport { handled: 4, failed: 1 });
}

#[test]
fn test_panicking_handler_does_not_stop_drain() {
    let (tx, mut rx) = dispatch_queue::<u32>("test");
    for i in 0..3 {
        tx.enqueue(i);
    }

    let mut seen = Vec::new();
    let report = rx.drain(|n| {
        if n == 1 {
            panic!("handler exploded on {n}");
        }
        seen.push(n);
        Ok::<_, String>(())
    });

    assert_eq!(seen, vec![0, 2]);
    assert_eq!(report, DrainReport { handled: 2, failed: 1 });
}

// =========================================================================
// Drain boundaries
// =========================================================================

#[test]
fn test_items_enqueued_mid_drain_wait_for_next_drain() {
    let (tx, mut rx) = dispatch_queue::<u32>("test");
    tx.enqueue(1);
    tx.enqueue(2);

    let producer = tx.clone();
    let mut first = Vec::new();
    rx.drain(|n| {
        first.push(n);
        producer.enqueue(n + 10);
        Ok::<_, String>(())
    });
    assert_eq!(first, vec![1, 2]);
    assert_eq!(rx.len(), 2);

    let mut second = Vec::new();
    rx.drain(|n| {
        second.push(n);
        Ok::<_, String>(())
    });
    assert_eq!(second, vec![11, 12]);
}

#[test]
fn test_drain_on_empty_queue_reports_nothing() {
    let (_tx, mut rx) = dispatch_queue::<u32>("test");
    let report = rx.drain(|_| Ok::<_, String>(()));
    assert_eq!(report.total(), 0);
}

#[test]
fn test_enqueue_after_consumer_dropped_returns_false() {
    let (tx, rx) = dispatch_queue::<u32>("test");
    assert!(!tx.is_closed());
    drop(rx);
    assert!(tx.is_closed());
    assert!(!tx.enqueue(7));
}

#[tokio::test]
async fn test_recv_waits_for_item() {
    let (tx, mut rx) = dispatch_queue::<&'static str>("login");
    tokio::spawn(async move {
        tx.enqueue("LOGIN_OK");
    });
    assert_eq!(rx.recv().await, Some("LOGIN_OK"));
    assert_eq!(rx.recv().await, None);
}
