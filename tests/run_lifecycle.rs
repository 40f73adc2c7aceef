//! Lifecycle tests against the public ledger API.

use std::sync::Arc;
use std::thread;

use dune_ledger::{
    AdminList, CraftingCost, Distribution, Identity, RunError, RunKind, RunLedger, RunUpdate,
    Stations, compute_plastanium, compute_spice,
};
use rust_decimal::Decimal;

fn dec(n: i64) -> Decimal {
    Decimal::from(n)
}

fn ledger() -> RunLedger {
    RunLedger::new(Arc::new(AdminList::new(["stilgar"])))
}

fn leto() -> Identity {
    Identity::from("leto")
}

#[test]
fn spice_reference_values() {
    let d = compute_spice(dec(10_000), 4, 2).unwrap();
    assert_eq!((d.melange_total, d.melange_per_player, d.remainder), (200, 50, 0));
    assert_eq!(d.water_total, dec(75_000));
    assert_eq!(d.water_per_processor, dec(37_500));
    assert_eq!(d.time_seconds, dec(1_350));
}

#[test]
fn plastanium_reference_values() {
    let d = compute_plastanium(dec(1_000), dec(10_000), 4, 2, 2, CraftingCost::Standard).unwrap();
    assert_eq!(d.fibers.fiber_total, 333);
    assert_eq!(d.plastanium.plastanium_total, 333);
    assert_eq!(d.plastanium_per_player, 83);
    assert_eq!(d.remainder, 1);
}

#[test]
fn empty_roster_allocates_no_id() {
    let ledger = ledger();
    let err = ledger.create_run(RunKind::Spice, &leto(), "  ,  ").unwrap_err();
    assert!(matches!(err, RunError::InvalidArgument(_)));
    assert!(ledger.list_runs().is_empty());

    let id = ledger.create_run(RunKind::Spice, &leto(), "paul").unwrap();
    assert_eq!(id.0, 1);
}

#[test]
fn full_spice_run() {
    let ledger = ledger();
    let id = ledger
        .create_run(RunKind::Spice, &leto(), "paul, chani, jessica")
        .unwrap();
    ledger
        .update_run(id, RunUpdate::parse("spice", None, Some("25000")).unwrap())
        .unwrap();
    ledger
        .update_run(id, RunUpdate::parse("players", Some("gurney"), None).unwrap())
        .unwrap();

    let result = ledger.calculate_run(id, Stations::new(2)).unwrap();
    let Distribution::Spice(d) = &result else {
        panic!("expected spice result");
    };
    assert_eq!(d.players, 4);
    assert_eq!(d.melange_total, 500);
    assert_eq!(d.melange_per_player, 125);
    assert_eq!(d.time_seconds, dec(3_375));

    let snapshot = ledger.view_run(id).unwrap();
    assert_eq!(snapshot.creator, leto());
    assert_eq!(snapshot.players, vec!["paul", "chani", "jessica", "gurney"]);
    assert_eq!(snapshot.last_calculation, Some(result));
}

#[test]
fn non_creator_cannot_delete() {
    let ledger = ledger();
    let id = ledger.create_run(RunKind::Stravidium, &leto(), "paul").unwrap();

    let err = ledger.delete_run(id, &Identity::from("feyd")).unwrap_err();
    assert_eq!(
        err,
        RunError::PermissionDenied {
            requester: Identity::from("feyd"),
            run: id
        }
    );
    assert!(ledger.view_run(id).is_ok());

    ledger.delete_run(id, &Identity::from("stilgar")).unwrap();
    assert_eq!(ledger.view_run(id), Err(RunError::NotFound(id)));
    assert_eq!(
        ledger.update_run(id, RunUpdate::StravMass(dec(3))),
        Err(RunError::NotFound(id))
    );
    assert_eq!(
        ledger.calculate_run(id, Stations::new(1)),
        Err(RunError::NotFound(id))
    );
}

#[test]
fn unknown_id_leaves_other_runs_alone() {
    let ledger = ledger();
    let id = ledger.create_run(RunKind::Spice, &leto(), "paul").unwrap();
    ledger.update_run(id, RunUpdate::Sand(dec(1_000))).unwrap();
    let before = ledger.view_run(id).unwrap();

    let missing = dune_ledger::RunId(999);
    assert_eq!(
        ledger.update_run(missing, RunUpdate::Sand(dec(5))),
        Err(RunError::NotFound(missing))
    );
    assert_eq!(ledger.view_run(id).unwrap(), before);
}

#[test]
fn zero_processors_does_not_touch_cache() {
    let ledger = ledger();
    let id = ledger.create_run(RunKind::Spice, &leto(), "paul").unwrap();
    ledger.update_run(id, RunUpdate::Sand(dec(10_000))).unwrap();
    assert!(ledger.calculate_run(id, Stations::new(0)).is_err());
    assert!(ledger.view_run(id).unwrap().last_calculation.is_none());
}

#[test]
fn concurrent_updates_never_interleave() {
    let ledger = Arc::new(ledger());
    let id = ledger.create_run(RunKind::Plastanium, &leto(), "paul").unwrap();

    let writers: Vec<_> = (0..8)
        .map(|t| {
            let ledger = Arc::clone(&ledger);
            thread::spawn(move || {
                for i in 0..200 {
                    let name = format!("p{t}-{i}");
                    ledger.update_run(id, RunUpdate::AddPlayer(name)).unwrap();
                    ledger
                        .update_run(id, RunUpdate::Titanium(dec(t * 1_000 + i)))
                        .unwrap();
                }
            })
        })
        .collect();

    let reader = {
        let ledger = Arc::clone(&ledger);
        thread::spawn(move || {
            for _ in 0..500 {
                let run = ledger.view_run(id).unwrap();
                let mut names = run.players.clone();
                names.sort();
                names.dedup();
                assert_eq!(names.len(), run.players.len());
            }
        })
    };

    for w in writers {
        w.join().unwrap();
    }
    reader.join().unwrap();

    let run = ledger.view_run(id).unwrap();
    assert_eq!(run.players.len(), 1 + 8 * 200);
}

#[test]
fn concurrent_duplicate_adds_conflict_once() {
    let ledger = Arc::new(ledger());
    let id = ledger.create_run(RunKind::Spice, &leto(), "paul").unwrap();

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let ledger = Arc::clone(&ledger);
            thread::spawn(move || ledger.update_run(id, RunUpdate::AddPlayer("chani".into())))
        })
        .collect();
    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(
        results
            .iter()
            .filter_map(|r| r.as_ref().err())
            .all(|e| e.code() == "CONFLICT")
    );
    assert_eq!(ledger.view_run(id).unwrap().players, vec!["paul", "chani"]);
}
