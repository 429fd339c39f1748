//! End-to-end domain tests: a full order lifecycle folded back through the
//! ledger must reproduce the projection exactly.

use chrono::{Duration, NaiveDate, TimeZone, Utc};
use common::{CustomerId, OrderId, ProductTypeId, UserId, VendorId};
use domain::{
    EventType, LedgerEntry, NewOrder, Order, OrderNumber, OrderPatch, OrderStatus, replay,
};

fn actor() -> UserId {
    UserId::from_string("U-owner")
}

fn new_order(title: &str, promised: NaiveDate) -> Order {
    let at = Utc.with_ymd_and_hms(2026, 2, 2, 8, 30, 0).unwrap();
    Order::create(
        NewOrder {
            id: OrderId::generate(),
            order_number: OrderNumber::first("2602"),
            customer_id: CustomerId::from_string("C-bakery"),
            product_type_id: ProductTypeId::from_string("PT-poster"),
            title: title.to_string(),
            description: None,
            quantity: Some(20),
            received_date: NaiveDate::from_ymd_opt(2026, 2, 2).unwrap(),
            promised_date: promised,
            internal_due_date: None,
            notes: None,
            is_test: false,
        },
        at,
    )
}

#[test]
fn full_lifecycle_replays_to_final_projection() {
    let order = new_order("Window posters", NaiveDate::from_ymd_opt(2026, 2, 14).unwrap());
    let mut entries = vec![LedgerEntry::created(&order, &actor(), order.created_at)];
    entries[0].seq = 1;
    let mut seq = 1;
    let mut record = |entries: &mut Vec<LedgerEntry>, mut entry: LedgerEntry| {
        seq += 1;
        entry.seq = seq;
        entries.push(entry);
    };

    // edit, start work, send to a vendor, finish, deliver
    let t1 = order.created_at + Duration::hours(3);
    let m1 = order
        .revise(
            &OrderPatch {
                quantity: Some(Some(25)),
                internal_due_date: Some(Some(NaiveDate::from_ymd_opt(2026, 2, 12).unwrap())),
                ..OrderPatch::default()
            },
            &actor(),
            t1,
        )
        .expect("patch changes two fields");
    record(&mut entries, m1.entry.clone());

    let t2 = t1 + Duration::hours(2);
    let m2 = m1
        .after
        .change_status(OrderStatus::InProgress, &actor(), t2)
        .unwrap()
        .unwrap();
    record(&mut entries, m2.entry.clone());

    let t3 = t2 + Duration::days(1);
    let m3 = m2
        .after
        .assign_vendor(Some(VendorId::from_string("V-widefmt")), &actor(), t3)
        .unwrap();
    record(&mut entries, m3.entry.clone());

    let t4 = t3 + Duration::days(2);
    let m4 = m3
        .after
        .change_status(OrderStatus::Ready, &actor(), t4)
        .unwrap()
        .unwrap();
    record(&mut entries, m4.entry.clone());

    let t5 = t4 + Duration::days(1);
    let m5 = m4.after.mark_delivered(&actor(), t5).unwrap();
    record(&mut entries, m5.entry.clone());

    let final_state = m5.after;
    assert_eq!(final_state.status, OrderStatus::Delivered);
    assert_eq!(final_state.delivered_at, Some(t5));
    assert_eq!(final_state.revision, 6);

    // one entry per mutation, in strict chronological order
    assert_eq!(entries.len(), 6);
    assert!(
        entries
            .windows(2)
            .all(|w| w[0].occurred_at < w[1].occurred_at)
    );

    // the ledger is authoritative: the fold reproduces the row exactly
    assert_eq!(replay(&entries), Some(final_state));
}

#[test]
fn soft_delete_and_restore_round_trip_through_replay() {
    let order = new_order("Loyalty cards", NaiveDate::from_ymd_opt(2026, 2, 20).unwrap());
    let mut entries = vec![LedgerEntry::created(&order, &actor(), order.created_at)];
    entries[0].seq = 1;

    let t1 = order.created_at + Duration::hours(1);
    let deleted = order.soft_delete(&actor(), t1).unwrap();
    let mut e1 = deleted.entry.clone();
    e1.seq = 2;
    entries.push(e1);

    let t2 = t1 + Duration::hours(1);
    let restored = deleted.after.restore(&actor(), t2).unwrap();
    let mut e2 = restored.entry.clone();
    e2.seq = 3;
    entries.push(e2);

    assert_eq!(entries[1].event_type, EventType::SoftDeleted);
    assert_eq!(entries[2].event_type, EventType::Restored);

    let replayed = replay(&entries).unwrap();
    assert_eq!(replayed, restored.after);
    assert!(!replayed.is_deleted);
    assert_eq!(replayed.revision, 3);
}

#[test]
fn terminal_orders_reject_every_further_transition() {
    let order = new_order("Rush decals", NaiveDate::from_ymd_opt(2026, 2, 6).unwrap());
    let cancelled = order
        .cancel(Some("duplicate entry".to_string()), &actor(), Utc::now())
        .unwrap()
        .after;

    assert!(cancelled.mark_delivered(&actor(), Utc::now()).is_err());
    assert!(cancelled.cancel(None, &actor(), Utc::now()).is_err());
    assert!(
        cancelled
            .change_status(OrderStatus::New, &actor(), Utc::now())
            .is_err()
    );
}
