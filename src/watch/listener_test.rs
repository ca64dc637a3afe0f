use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde_json::json;
use tokio::time::sleep;

use crate::{CheckArgs, ListenerId, Watch};

fn counter() -> (Arc<AtomicUsize>, impl Fn() -> usize) {
    let count = Arc::new(AtomicUsize::new(0));
    let reader = {
        let count = Arc::clone(&count);
        move || count.load(Ordering::SeqCst)
    };
    (count, reader)
}

#[test]
fn test_listener_ids_are_unique() {
    let a = ListenerId::generate();
    let b = ListenerId::generate();
    assert_ne!(a, b);
    assert!(!a.to_string().is_empty());
}

#[test]
fn test_zero_delay_runs_synchronously() {
    let watch = Watch::new("boot");
    watch.add_check("only").unwrap();

    let (fired, read) = counter();
    watch.add_listener(
        move |_| {
            fired.fetch_add(1, Ordering::SeqCst);
        },
        Some(Duration::ZERO),
    );

    watch.check("only");
    // Zero delay means within the current dispatch pass, no timer involved.
    assert_eq!(read(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_delayed_watch_listener_fires_after_delay() {
    let watch = Watch::new("boot");
    watch.add_check("only").unwrap();

    let (fired, read) = counter();
    watch.add_listener(
        move |_| {
            fired.fetch_add(1, Ordering::SeqCst);
        },
        Some(Duration::from_millis(50)),
    );

    watch.check("only");
    assert!(watch.is_done());
    // Scheduled but not yet due.
    assert_eq!(read(), 0);

    sleep(Duration::from_millis(49)).await;
    assert_eq!(read(), 0);

    sleep(Duration::from_millis(2)).await;
    assert_eq!(read(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_delayed_immediate_fire_on_done_watch() {
    let watch = Watch::new("boot");
    watch.add_check("only").unwrap();
    watch.check("only");
    assert!(watch.is_done());

    let (fired, read) = counter();
    let id = watch.add_listener(
        move |_| {
            fired.fetch_add(1, Ordering::SeqCst);
        },
        Some(Duration::from_millis(20)),
    );

    // Fired through the timer, so no registration id even though delayed.
    assert!(id.is_none());
    assert_eq!(read(), 0);

    sleep(Duration::from_millis(25)).await;
    assert_eq!(read(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_delayed_check_listener_receives_recorded_args() {
    let watch = Watch::new("transfers");
    watch.add_check("upload").unwrap();

    let seen: Arc<Mutex<Option<CheckArgs>>> = Arc::new(Mutex::new(None));
    let sink = Arc::clone(&seen);
    watch
        .add_check_listener(
            "upload",
            move |args| {
                *sink.lock() = Some(args);
            },
            Some(Duration::from_millis(10)),
        )
        .unwrap();

    watch.check_with("upload", vec![json!(7)]);
    assert!(seen.lock().is_none());

    sleep(Duration::from_millis(15)).await;
    assert_eq!(&*seen.lock().clone().unwrap(), &[json!(7)]);
}

#[tokio::test(start_paused = true)]
async fn test_undelayed_listener_fires_before_delayed_one() {
    let watch = Watch::new("boot");
    watch.add_check("only").unwrap();

    let order: Arc<Mutex<Vec<&'static str>>> = Arc::new(Mutex::new(Vec::new()));
    {
        let order = Arc::clone(&order);
        watch.add_listener(
            move |_| {
                order.lock().push("delayed");
            },
            Some(Duration::from_millis(50)),
        );
    }
    {
        let order = Arc::clone(&order);
        watch.add_listener(
            move |_| {
                order.lock().push("sync");
            },
            None,
        );
    }

    watch.check("only");
    assert_eq!(*order.lock(), vec!["sync"]);

    sleep(Duration::from_millis(60)).await;
    assert_eq!(*order.lock(), vec!["sync", "delayed"]);
}
