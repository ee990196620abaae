//! Attendee clone synchronization tests.
//!
//! Every test materializes three clones through an un-check-in and then edits
//! the canonical attendee or one of its clones directly through the store.
//!
//! Run with: `cargo test --test sync_test`

#![allow(clippy::expect_used)]
#![allow(clippy::unwrap_used)]

mod common;

use common::{FLAG, Harness, LINK, NAME};
use serde_json::json;
use series_pass_core::record::{QR_STATUS_KEY, TRASH_STATUS};
use series_pass_core::{RecordChange, RecordId, RecordStore};
use series_pass_testing::RecordingListener;
use std::collections::BTreeMap;
use std::sync::Arc;

struct Family {
    h: Harness,
    canonical: RecordId,
    clones: Vec<RecordId>,
}

fn family() -> Family {
    let h = Harness::new();
    h.event(10, -5, -3);
    h.event(11, -1, 1);
    h.event(12, 10, 12);
    let canonical = h.pass_holder("Ada");

    assert!(h.service.request().handle_uncheckin(canonical, None).is_success());
    let clones: Vec<RecordId> = h.clones_of(canonical).iter().map(|clone| clone.id).collect();
    assert_eq!(clones.len(), 3);

    Family {
        h,
        canonical,
        clones,
    }
}

fn status(value: &str) -> BTreeMap<String, String> {
    BTreeMap::from([("status".to_string(), value.to_string())])
}

#[test]
fn canonical_attribute_update_reaches_every_clone() {
    let f = family();
    f.h.store.set_attribute(f.canonical, NAME, json!("Ada King")).unwrap();

    for clone in &f.clones {
        assert_eq!(f.h.attribute(*clone, NAME), Some(json!("Ada King")));
    }
}

#[test]
fn clone_attribute_update_reaches_canonical_and_siblings_once() {
    let f = family();
    let listener = Arc::new(RecordingListener::new());
    f.h.store.subscribe(listener.clone());

    f.h.store
        .set_attribute(f.clones[1], "_tribe_rsvp_email", json!("ada@example.com"))
        .unwrap();

    assert_eq!(f.h.attribute(f.canonical, "_tribe_rsvp_email"), Some(json!("ada@example.com")));
    assert_eq!(f.h.attribute(f.clones[0], "_tribe_rsvp_email"), Some(json!("ada@example.com")));
    assert_eq!(f.h.attribute(f.clones[2], "_tribe_rsvp_email"), Some(json!("ada@example.com")));

    let changes = listener.changes();
    let written: Vec<RecordId> = changes.iter().map(RecordChange::record_id).collect();
    assert_eq!(written.len(), 4);
    assert_eq!(written.iter().filter(|id| **id == f.clones[1]).count(), 1);
    assert_eq!(written.iter().filter(|id| **id == f.canonical).count(), 1);
}

#[test]
fn attribute_deletion_is_mirrored() {
    let f = family();
    f.h.store.delete_attribute(f.clones[0], NAME).unwrap();

    assert_eq!(f.h.attribute(f.canonical, NAME), None);
    for clone in &f.clones {
        assert_eq!(f.h.attribute(*clone, NAME), None);
    }
}

#[test]
fn checkin_state_never_propagates() {
    let f = family();
    f.h.store.set_attribute(f.clones[0], FLAG, json!("1")).unwrap();
    f.h.store
        .set_attribute(f.clones[0], &format!("{FLAG}_details"), json!({ "source": "app" }))
        .unwrap();
    f.h.store.set_attribute(f.clones[0], QR_STATUS_KEY, json!("1")).unwrap();

    for id in [f.canonical, f.clones[1], f.clones[2]] {
        assert_eq!(f.h.attribute(id, FLAG), None);
        assert_eq!(f.h.attribute(id, &format!("{FLAG}_details")), None);
        assert_eq!(f.h.attribute(id, QR_STATUS_KEY), None);
    }
}

#[test]
fn occurrence_links_never_propagate() {
    let f = family();
    let before: Vec<_> = f.clones.iter().map(|id| f.h.attribute(*id, LINK)).collect();

    f.h.store.set_attribute(f.clones[0], LINK, json!(77)).unwrap();

    assert_eq!(f.h.attribute(f.canonical, LINK), Some(json!(f.h.series)));
    assert_eq!(f.h.attribute(f.clones[1], LINK), before[1]);
    assert_eq!(f.h.attribute(f.clones[2], LINK), before[2]);
}

#[test]
fn field_edits_propagate_both_ways() {
    let f = family();
    f.h.store
        .update_fields(f.canonical, BTreeMap::from([("title".to_string(), "Ada K.".to_string())]))
        .unwrap();
    f.h.store
        .update_fields(f.clones[2], BTreeMap::from([("author".to_string(), "7".to_string())]))
        .unwrap();

    for id in [f.canonical, f.clones[0], f.clones[1], f.clones[2]] {
        let record = f.h.store.record(id).unwrap();
        assert_eq!(record.field("title"), Some("Ada K."));
        assert_eq!(record.field("author"), Some("7"));
    }
}

#[test]
fn trashing_a_clone_is_isolated() {
    let f = family();
    f.h.store.update_fields(f.clones[0], status(TRASH_STATUS)).unwrap();

    assert_eq!(f.h.status(f.clones[0]), TRASH_STATUS);
    assert_eq!(f.h.status(f.canonical), "publish");
    assert_eq!(f.h.status(f.clones[1]), "publish");
    assert_eq!(f.h.status(f.clones[2]), "publish");
}

#[test]
fn clone_status_never_propagates_upward() {
    let f = family();
    f.h.store.update_fields(f.clones[0], status("private")).unwrap();

    assert_eq!(f.h.status(f.clones[0]), "private");
    assert_eq!(f.h.status(f.canonical), "publish");
    assert_eq!(f.h.status(f.clones[1]), "publish");
    assert_eq!(f.h.status(f.clones[2]), "publish");
}

#[test]
fn trashing_the_canonical_trashes_clones() {
    let f = family();
    f.h.store.update_fields(f.canonical, status(TRASH_STATUS)).unwrap();

    for clone in &f.clones {
        assert_eq!(f.h.status(*clone), TRASH_STATUS);
    }
}

#[test]
fn deleting_the_canonical_deletes_every_clone() {
    let f = family();
    f.h.store.delete(f.canonical).unwrap();

    for clone in &f.clones {
        assert!(!f.h.store.contains(*clone));
    }
}

#[test]
fn deleting_a_clone_does_not_cascade() {
    let f = family();
    f.h.store.delete(f.clones[1]).unwrap();

    assert!(f.h.store.contains(f.canonical));
    assert!(f.h.store.contains(f.clones[0]));
    assert!(f.h.store.contains(f.clones[2]));
}

#[test]
fn moving_the_pass_deletes_its_clones() {
    let f = family();
    f.h.store.set_attribute(f.canonical, LINK, json!(2_000)).unwrap();

    assert!(f.h.clones_of(f.canonical).is_empty());
    assert!(f.h.store.contains(f.canonical));
}

#[test]
fn dropping_the_service_stops_sync() {
    let f = family();
    let Family { h, canonical, clones } = f;
    let store = Arc::clone(&h.store);
    drop(h);

    assert_eq!(store.listener_count(), 0);
    store.set_attribute(canonical, NAME, json!("Ada King")).unwrap();
    assert_eq!(
        store.record(clones[0]).unwrap().attribute(NAME),
        Some(&json!("Ada"))
    );
}
