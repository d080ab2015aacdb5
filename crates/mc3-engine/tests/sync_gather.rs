use std::thread;

use mc3_core::Mc3Error;
use mc3_engine::sync::{broadcast, gather, mesh, LocalChannel, SyncChannel};

#[test]
fn single_worker_gathers_assemble_locally() {
    let channel = LocalChannel::new();
    let gathered = gather(&channel, vec![(0, 1.5f64), (1, 2.5)], 2).unwrap();
    assert_eq!(gathered, Some(vec![1.5, 2.5]));
}

#[test]
fn single_worker_broadcasts_return_the_root_value() {
    let channel = LocalChannel::new();
    let published: Vec<f64> = broadcast(&channel, 0, Some(vec![1.0, 0.5])).unwrap();
    assert_eq!(published, vec![1.0, 0.5]);
}

#[test]
fn broadcast_roots_must_hold_a_value() {
    let channel = LocalChannel::new();
    let err = broadcast::<f64, _>(&channel, 0, None).unwrap_err();
    assert_eq!(err.info().code, "broadcast-missing");
}

#[test]
fn gathers_reject_malformed_contributions() {
    let channel = LocalChannel::new();

    let err = gather(&channel, vec![(0, 1.0f64), (0, 2.0)], 2).unwrap_err();
    assert_eq!(err.info().code, "gather-duplicate");

    let err = gather(&channel, vec![(0, 1.0f64)], 2).unwrap_err();
    assert_eq!(err.info().code, "gather-missing");

    let err = gather(&channel, vec![(7, 1.0f64)], 2).unwrap_err();
    assert_eq!(err.info().code, "gather-range");
}

#[test]
fn single_worker_channels_have_no_peers() {
    let channel = LocalChannel::new();
    assert!(matches!(channel.send(1, Vec::new()), Err(Mc3Error::Sync(_))));
    assert!(matches!(channel.recv(1), Err(Mc3Error::Sync(_))));
}

#[test]
fn two_worker_meshes_gather_and_broadcast() {
    let mut endpoints = mesh(2);
    let worker1 = endpoints.pop().unwrap();
    let worker0 = endpoints.pop().unwrap();

    let handle = thread::spawn(move || {
        let gathered = gather(&worker1, vec![(1, 20.0f64)], 2).unwrap();
        assert!(gathered.is_none());
        let published: f64 = broadcast(&worker1, 0, None).unwrap();
        worker1.barrier();
        published
    });

    let gathered = gather(&worker0, vec![(0, 10.0f64)], 2).unwrap();
    assert_eq!(gathered, Some(vec![10.0, 20.0]));
    let published: f64 = broadcast(&worker0, 0, Some(42.0)).unwrap();
    assert_eq!(published, 42.0);
    worker0.barrier();

    assert_eq!(handle.join().unwrap(), 42.0);
}

#[test]
fn cross_worker_duplicates_fail_the_gather() {
    let mut endpoints = mesh(2);
    let worker1 = endpoints.pop().unwrap();
    let worker0 = endpoints.pop().unwrap();

    let handle = thread::spawn(move || gather(&worker1, vec![(0, 2.0f64)], 2).unwrap());

    let err = gather(&worker0, vec![(0, 1.0f64), (1, 3.0)], 2).unwrap_err();
    assert_eq!(err.info().code, "gather-duplicate");
    assert!(handle.join().unwrap().is_none());
}

#[test]
fn workers_lacking_chains_still_report_in() {
    let mut endpoints = mesh(2);
    let worker1 = endpoints.pop().unwrap();
    let worker0 = endpoints.pop().unwrap();

    let handle = thread::spawn(move || gather::<f64, _>(&worker1, Vec::new(), 1).unwrap());

    let gathered = gather(&worker0, vec![(0, 4.5f64)], 1).unwrap();
    assert_eq!(gathered, Some(vec![4.5]));
    assert!(handle.join().unwrap().is_none());
}

#[test]
fn messages_arrive_in_send_order_per_pair() {
    let mut endpoints = mesh(2);
    let worker1 = endpoints.pop().unwrap();
    let worker0 = endpoints.pop().unwrap();

    let handle = thread::spawn(move || {
        for value in 0u8..4 {
            worker1.send(0, vec![value]).unwrap();
        }
    });
    handle.join().unwrap();
    for value in 0u8..4 {
        assert_eq!(worker0.recv(1).unwrap(), vec![value]);
    }
}
