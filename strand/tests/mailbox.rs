use strand::task::spawn;
use strand::{
    ExecutionSerializer, Mailbox, NoValue, Probable, RuntimeBuilder, ThreadPerPass, yield_now,
};

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

#[strand::test]
async fn dequeues_one_two_three_then_nothing() {
    init_tracing();
    let mailbox = Mailbox::new();

    mailbox.enqueue(1).await;
    mailbox.enqueue(2).await;
    mailbox.enqueue(3).await;

    assert_eq!(mailbox.try_dequeue().await, Probable::Present(1));
    assert_eq!(mailbox.try_dequeue().await, Probable::Present(2));
    assert_eq!(mailbox.try_dequeue().await, Probable::Present(3));
    assert_eq!(mailbox.try_dequeue().await, NoValue);
}

#[strand::test]
async fn single_producer_order_is_kept() {
    let mailbox = Mailbox::new();

    for i in 0..1_000 {
        mailbox.enqueue(i).await;
    }
    assert_eq!(mailbox.len().await, 1_000);

    for expected in 0..1_000 {
        assert_eq!(mailbox.try_dequeue().await, Probable::Present(expected));
    }
    assert!(mailbox.is_empty().await);
}

#[strand::test(worker_threads = 2)]
async fn empty_dequeue_is_absent_and_idempotent() {
    let mailbox = Mailbox::<u32>::new();

    for _ in 0..3 {
        let item = mailbox.try_dequeue().await;
        assert!(item.is_absent());
        assert_eq!(item.to_string(), "No Value");
    }

    // A present zero is not absence.
    mailbox.enqueue(0).await;
    assert_eq!(mailbox.try_dequeue().await, Probable::Present(0));
    assert_eq!(mailbox.try_dequeue().await, NoValue);
}

#[test]
fn concurrent_producers_lose_and_duplicate_nothing() {
    init_tracing();
    const PRODUCERS: usize = 8;
    const ITEMS: usize = 500;

    let rt = RuntimeBuilder::new().worker_threads(4).build();

    let drained = rt.block_on(async {
        let mailbox = Mailbox::new();

        let producers: Vec<_> = (0..PRODUCERS)
            .map(|p| {
                let mailbox = mailbox.clone();
                spawn(async move {
                    for i in 0..ITEMS {
                        mailbox.enqueue((p, i)).await;
                    }
                })
            })
            .collect();

        for producer in producers {
            producer.await;
        }

        let mut drained = Vec::new();
        while let Probable::Present(item) = mailbox.try_dequeue().await {
            drained.push(item);
        }
        assert_eq!(mailbox.try_dequeue().await, NoValue);

        drained
    });

    assert_eq!(drained.len(), PRODUCERS * ITEMS);
    let unique: HashSet<_> = drained.iter().copied().collect();
    assert_eq!(unique.len(), PRODUCERS * ITEMS);

    let mut last = [None::<usize>; PRODUCERS];
    for (p, i) in drained {
        if let Some(prev) = last[p] {
            assert!(i > prev, "producer {p} reordered: {prev} then {i}");
        }
        last[p] = Some(i);
    }
}

#[test]
fn plain_threads_share_a_mailbox() {
    const THREADS: usize = 4;
    const ITEMS: usize = 250;

    let rt = RuntimeBuilder::new().worker_threads(2).build();
    let mailbox = Mailbox::with_host(rt.handle().clone());

    thread::scope(|scope| {
        for t in 0..THREADS {
            let mailbox = mailbox.clone();
            let rt = &rt;

            scope.spawn(move || {
                rt.block_on(async move {
                    for i in 0..ITEMS {
                        mailbox.enqueue(t * ITEMS + i).await;
                    }
                });
            });
        }
    });

    let consumer = mailbox.clone();
    let drained = rt.block_on(async move {
        let mut drained = Vec::new();
        while let Probable::Present(item) = consumer.try_dequeue().await {
            drained.push(item);
        }
        drained
    });

    let seen: HashSet<_> = drained.iter().copied().collect();
    assert_eq!(drained.len(), THREADS * ITEMS);
    assert_eq!(seen.len(), THREADS * ITEMS);
}

#[test]
fn producers_and_consumers_race() {
    const PRODUCERS: usize = 4;
    const CONSUMERS: usize = 4;
    const ITEMS: usize = 300;

    let rt = RuntimeBuilder::new().worker_threads(4).build();
    let taken = Arc::new(AtomicUsize::new(0));
    let sum = Arc::new(AtomicUsize::new(0));

    let (taken_c, sum_c) = (taken.clone(), sum.clone());
    rt.block_on(async move {
        let mailbox = Mailbox::new();
        let mut handles = Vec::new();

        for p in 0..PRODUCERS {
            let mailbox = mailbox.clone();
            handles.push(spawn(async move {
                for i in 0..ITEMS {
                    mailbox.enqueue(p * ITEMS + i).await;
                }
            }));
        }

        for _ in 0..CONSUMERS {
            let mailbox = mailbox.clone();
            let (taken, sum) = (taken_c.clone(), sum_c.clone());
            handles.push(spawn(async move {
                while taken.load(Ordering::SeqCst) < PRODUCERS * ITEMS {
                    match mailbox.try_dequeue().await {
                        Probable::Present(item) => {
                            sum.fetch_add(item, Ordering::SeqCst);
                            taken.fetch_add(1, Ordering::SeqCst);
                        }
                        Probable::Absent => yield_now().await,
                    }
                }
            }));
        }

        for handle in handles {
            handle.await;
        }

        assert_eq!(mailbox.try_dequeue().await, NoValue);
    });

    let n = PRODUCERS * ITEMS;
    assert_eq!(taken.load(Ordering::SeqCst), n);
    assert_eq!(sum.load(Ordering::SeqCst), n * (n - 1) / 2);
}

#[test]
fn mailbox_runs_on_any_host() {
    let rt = RuntimeBuilder::new().worker_threads(1).build();
    let mailbox = Mailbox::with_host(ThreadPerPass::named("mailbox-drain"));

    let drained = rt.block_on(async move {
        mailbox.enqueue("a").await;
        mailbox.enqueue("b").await;

        let drain_thread = mailbox
            .serializer()
            .suspension_point()
            .run(|| thread::current().name().map(str::to_owned))
            .await;

        (
            mailbox.try_dequeue().await,
            mailbox.try_dequeue().await,
            drain_thread,
        )
    });

    assert_eq!(drained.0, Probable::Present("a"));
    assert_eq!(drained.1, Probable::Present("b"));
    assert_eq!(drained.2.as_deref(), Some("mailbox-drain"));
}

#[strand::test]
async fn mailboxes_can_share_a_serializer() {
    let serializer = ExecutionSerializer::new(strand::Handle::current());
    let requests = Mailbox::with_serializer(serializer.clone());
    let replies = Mailbox::with_serializer(serializer.clone());

    requests.enqueue("ping").await;

    if let Probable::Present(request) = requests.try_dequeue().await {
        replies.enqueue(format!("{request} -> pong")).await;
    }

    assert_eq!(
        replies.try_dequeue().await,
        Probable::Present(String::from("ping -> pong"))
    );
    assert_eq!(requests.serializer().id(), replies.serializer().id());
    assert_eq!(requests.try_dequeue().await, NoValue);
}

#[strand::test]
async fn operations_scheduled_from_inside_the_drain_do_not_deadlock() {
    let mailbox = Mailbox::new();
    let serializer = mailbox.serializer().clone();

    let nested = mailbox.clone();
    let handle = strand::Handle::current();
    serializer
        .suspension_point()
        .run(move || {
            // Polled on a worker later; the current pass only queues it.
            handle.spawn(async move { nested.enqueue(42).await });
        })
        .await;

    loop {
        match mailbox.try_dequeue().await {
            Probable::Present(item) => {
                assert_eq!(item, 42);
                break;
            }
            Probable::Absent => yield_now().await,
        }
    }
}
