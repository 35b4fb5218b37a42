// Copyright 2020-2022 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

use std::collections::HashSet;
use std::sync::Arc;

use rand::distributions::{Bernoulli, Distribution};
use threadpool::ThreadPool;
use wstm::{TVar, Universe};

#[ctor::ctor]
/// Runs before any test in this file.
fn init_logger() {
    let _ = env_logger::builder()
        .is_test(true)
        .filter_level(log::LevelFilter::Debug)
        .try_init();
}

#[test]
fn bank_transfer_across_three_accounts() {
    let universe = Universe::with_memory(4);

    let alice: TVar<i64> = TVar::new(&universe, 10);
    let bob: TVar<i64> = TVar::new(&universe, 100);
    let charly: TVar<i64> = TVar::new(&universe, 0);

    let transfer_bob_charly = 30;
    let alice_bonus = 40;

    universe
        .read_write(|tx| {
            let mut amt_alice = alice.get(tx)?;
            let mut amt_bob = bob.get(tx)?;
            let mut amt_charly = charly.get(tx)?;
            amt_alice += alice_bonus;
            amt_bob -= transfer_bob_charly;
            amt_charly += transfer_bob_charly;

            alice.set(tx, amt_alice);
            bob.set(tx, amt_bob);
            charly.set(tx, amt_charly);
            Ok(())
        })
        .expect("transaction failed");

    assert_eq!(universe.read_only(|tx| alice.get(tx)).unwrap(), 50);
    assert_eq!(universe.read_only(|tx| bob.get(tx)).unwrap(), 70);
    assert_eq!(universe.read_only(|tx| charly.get(tx)).unwrap(), 30);
}

/// A set of concurrent inserters racing a set of read-only observers against
/// one shared counter `TVar`; every insert must eventually be visible and no
/// observer transaction should ever fail.
#[test]
fn threaded_inserts_are_all_observed_with_no_lost_updates() {
    let universe = Universe::with_memory(2);
    let entries: usize = 500;

    let counter: TVar<usize> = TVar::new(&universe, 0);
    let seen: Arc<std::sync::Mutex<HashSet<usize>>> = Arc::new(std::sync::Mutex::new(HashSet::new()));

    let pool = ThreadPool::new(8);
    for _ in 0..entries {
        let universe = Arc::clone(&universe);
        pool.execute(move || {
            universe
                .read_write(|tx| {
                    let v = counter.get(tx)?;
                    counter.set(tx, v + 1);
                    Ok(())
                })
                .expect("insert transaction failed");
        });

        let universe = Arc::clone(&universe);
        let seen = Arc::clone(&seen);
        pool.execute(move || {
            let v = universe
                .read_only(|tx| counter.get(tx))
                .expect("read-only transaction failed");
            seen.lock().unwrap().insert(v);
        });
    }
    pool.join();

    assert_eq!(universe.read_only(|tx| counter.get(tx)).unwrap(), entries);
    assert!(seen.lock().unwrap().iter().all(|&v| v <= entries));
}

#[test]
fn multiple_readers_observe_a_single_writers_result() {
    const EXPECTED: i64 = 15;

    let universe = Universe::with_memory(2);
    let tvar: TVar<i64> = TVar::new(&universe, 6);

    universe
        .read_write(|tx| {
            let data = tvar.get(tx)?;
            tvar.set(tx, data + 9);
            Ok(())
        })
        .unwrap();

    let pool = ThreadPool::new(8);
    for _ in 0..2000 {
        let universe = Arc::clone(&universe);
        pool.execute(move || {
            let data = universe.read_only(|tx| tvar.get(tx)).unwrap();
            assert_eq!(data, EXPECTED);
        });
    }
    pool.join();

    assert_eq!(universe.read_only(|tx| tvar.get(tx)).unwrap(), EXPECTED);
}

#[test]
fn concurrent_writers_and_readers_never_see_a_torn_pair() {
    // Two words updated together must never be observed half-updated: a
    // reader always sees either the pre-transfer pair or the post-transfer
    // pair, never a mix.
    let universe = Universe::with_memory(2);
    let a: TVar<i64> = TVar::new(&universe, 50);
    let b: TVar<i64> = TVar::new(&universe, 50);

    let pool = ThreadPool::new(8);
    for _ in 0..4 {
        let universe = Arc::clone(&universe);
        pool.execute(move || {
            for _ in 0..200 {
                universe
                    .read_write(|tx| {
                        let va = a.get(tx)?;
                        let vb = b.get(tx)?;
                        a.set(tx, va - 1);
                        b.set(tx, vb + 1);
                        Ok(())
                    })
                    .unwrap();
            }
        });
    }
    for _ in 0..4 {
        let universe = Arc::clone(&universe);
        pool.execute(move || {
            for _ in 0..200 {
                let (va, vb) = universe
                    .read_only(|tx| Ok((a.get(tx)?, b.get(tx)?)))
                    .unwrap();
                assert_eq!(va + vb, 100, "observed a torn update: a={va} b={vb}");
            }
        });
    }
    pool.join();

    let (va, vb) = universe.read_only(|tx| Ok((a.get(tx)?, b.get(tx)?))).unwrap();
    assert_eq!(va + vb, 100);
}

/// A mixed read/write workload, each worker independently sampling whether
/// to read or increment, the way the teacher's threaded STM test picks reads
/// vs. writes per worker with a Bernoulli draw.
#[test]
fn mixed_read_write_workload_converges_to_the_write_count() {
    let universe = Universe::with_memory(2);
    let counter: TVar<usize> = TVar::new(&universe, 0);
    let distribution = Bernoulli::new(0.3).unwrap();

    let pool = ThreadPool::new(8);
    let mut expected_writes = 0usize;
    for _ in 0..1000 {
        let is_write = distribution.sample(&mut rand::thread_rng());
        let universe = Arc::clone(&universe);
        if is_write {
            expected_writes += 1;
            pool.execute(move || {
                universe
                    .read_write(|tx| {
                        let v = counter.get(tx)?;
                        counter.set(tx, v + 1);
                        Ok(())
                    })
                    .expect("write transaction failed");
            });
        } else {
            pool.execute(move || {
                universe
                    .read_only(|tx| counter.get(tx))
                    .expect("read-only transaction failed");
            });
        }
    }
    pool.join();

    assert_eq!(universe.read_only(|tx| counter.get(tx)).unwrap(), expected_writes);
}
