//! Concurrent stream scheduling.

use super::helpers::{default_vm, f32_blob};
use crate::instructions::{CPU_WRITE_BLOB_BY_CALLBACK, WRITE_BLOB_BY_CALLBACK};
use crate::ofblob::OfBlob;
use crate::operand::WriteBlobArgCbOperand;
use eager_types::StreamCategory;
use parking_lot::Mutex;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

fn run<F: std::future::Future>(future: F) -> F::Output {
    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .unwrap()
        .block_on(future)
}

#[test]
fn test_order_preserved_per_stream() {
    let vm = default_vm();
    let log = Arc::new(Mutex::new(Vec::new()));

    for i in 0..8u32 {
        for (name, category) in [
            (WRITE_BLOB_BY_CALLBACK, StreamCategory::Host),
            (CPU_WRITE_BLOB_BY_CALLBACK, StreamCategory::Cpu),
        ] {
            let log = Arc::clone(&log);
            vm.receive(
                name,
                WriteBlobArgCbOperand::new(
                    f32_blob("x", &[0.0]),
                    Arc::new(move |_: &mut OfBlob<'_>| log.lock().push((category, i))),
                ),
            )
            .unwrap();
        }
    }

    assert_eq!(run(vm.schedule_concurrently()).unwrap(), 16);

    let log = log.lock();
    for category in [StreamCategory::Host, StreamCategory::Cpu] {
        let order: Vec<u32> = log
            .iter()
            .filter(|(c, _)| *c == category)
            .map(|(_, i)| *i)
            .collect();
        assert_eq!(order, (0..8).collect::<Vec<_>>());
    }
}

#[test]
fn test_streams_make_progress_independently() {
    let vm = default_vm();
    let blob = f32_blob("shared", &[0.0]);
    let (tx, rx) = std::sync::mpsc::channel::<()>();
    let rx = Mutex::new(rx);
    let tx = Mutex::new(tx);

    // The host callback blocks its stream until the CPU stream has run.
    vm.receive(
        WRITE_BLOB_BY_CALLBACK,
        WriteBlobArgCbOperand::new(
            f32_blob("gate", &[0.0]),
            Arc::new(move |_: &mut OfBlob<'_>| {
                rx.lock().recv_timeout(Duration::from_secs(5)).unwrap();
            }),
        ),
    )
    .unwrap();
    vm.receive(
        CPU_WRITE_BLOB_BY_CALLBACK,
        WriteBlobArgCbOperand::new(
            Arc::clone(&blob),
            Arc::new(move |ofblob: &mut OfBlob<'_>| {
                ofblob.write_f32s(&[1.0]).unwrap();
                tx.lock().send(()).unwrap();
            }),
        ),
    )
    .unwrap();

    assert_eq!(run(vm.schedule_concurrently()).unwrap(), 2);
    assert_eq!(blob.snapshot().to_f32s().unwrap(), vec![1.0]);
}

#[test]
fn test_callback_blocks_its_stream() {
    let vm = default_vm();
    let log = Arc::new(Mutex::new(Vec::new()));

    let first = Arc::clone(&log);
    vm.receive(
        CPU_WRITE_BLOB_BY_CALLBACK,
        WriteBlobArgCbOperand::new(
            f32_blob("a", &[0.0]),
            Arc::new(move |_: &mut OfBlob<'_>| {
                thread::sleep(Duration::from_millis(20));
                first.lock().push("slow");
            }),
        ),
    )
    .unwrap();
    let second = Arc::clone(&log);
    vm.receive(
        CPU_WRITE_BLOB_BY_CALLBACK,
        WriteBlobArgCbOperand::new(
            f32_blob("b", &[0.0]),
            Arc::new(move |_: &mut OfBlob<'_>| second.lock().push("fast")),
        ),
    )
    .unwrap();

    run(vm.schedule_concurrently()).unwrap();
    assert_eq!(*log.lock(), vec!["slow", "fast"]);
}

#[test]
fn test_two_schedulers_keep_stream_order() {
    let vm = Arc::new(default_vm());
    let log = Arc::new(Mutex::new(Vec::new()));

    for i in 0..4u32 {
        let log = Arc::clone(&log);
        vm.receive(
            CPU_WRITE_BLOB_BY_CALLBACK,
            WriteBlobArgCbOperand::new(
                f32_blob("x", &[0.0]),
                Arc::new(move |_: &mut OfBlob<'_>| {
                    if i == 0 {
                        thread::sleep(Duration::from_millis(100));
                    }
                    log.lock().push(i);
                }),
            ),
        )
        .unwrap();
    }

    let first = {
        let vm = Arc::clone(&vm);
        thread::spawn(move || vm.schedule())
    };
    thread::sleep(Duration::from_millis(10));
    let second = {
        let vm = Arc::clone(&vm);
        thread::spawn(move || vm.schedule())
    };

    let executed = first.join().unwrap() + second.join().unwrap();
    assert_eq!(executed, 4);
    assert_eq!(*log.lock(), vec![0, 1, 2, 3]);
    assert_eq!(vm.pending_len(), 0);
}

#[test]
fn test_schedule_from_callback_keeps_stream_order() {
    let vm = Arc::new(default_vm());
    let log = Arc::new(Mutex::new(Vec::new()));

    let vm_in_cb = Arc::clone(&vm);
    let first = Arc::clone(&log);
    vm.receive(
        CPU_WRITE_BLOB_BY_CALLBACK,
        WriteBlobArgCbOperand::new(
            f32_blob("a", &[0.0]),
            Arc::new(move |_: &mut OfBlob<'_>| {
                first.lock().push("first:start");
                let nested = vm_in_cb.schedule();
                first.lock().push(if nested == 0 { "first:end" } else { "first:nested-ran" });
            }),
        ),
    )
    .unwrap();
    let second = Arc::clone(&log);
    vm.receive(
        CPU_WRITE_BLOB_BY_CALLBACK,
        WriteBlobArgCbOperand::new(
            f32_blob("b", &[0.0]),
            Arc::new(move |_: &mut OfBlob<'_>| second.lock().push("second")),
        ),
    )
    .unwrap();

    assert_eq!(vm.schedule(), 2);
    assert_eq!(*log.lock(), vec!["first:start", "first:end", "second"]);
}

#[test]
#[should_panic(expected = "expects a WriteBlobArgCb operand")]
fn test_contract_violation_propagates_from_worker() {
    use crate::operand::LazyReferenceOperand;

    let vm = default_vm();
    vm.receive(
        CPU_WRITE_BLOB_BY_CALLBACK,
        LazyReferenceOperand::new(f32_blob("x", &[0.0]), "graph.x"),
    )
    .unwrap();
    let _ = run(vm.schedule_concurrently());
}
