use chrono::{Duration, NaiveDate, TimeZone, Utc};
use common::{CustomerId, OrderId, ProductTypeId, UserId, VendorId};
use criterion::{Criterion, criterion_group, criterion_main};
use domain::{
    LedgerEntry, NewOrder, Order, OrderNumber, OrderPatch, OrderStatus, diff, replay,
};

fn base_order() -> Order {
    let at = Utc.with_ymd_and_hms(2026, 2, 2, 9, 0, 0).unwrap();
    Order::create(
        NewOrder {
            id: OrderId::generate(),
            order_number: OrderNumber::first("2602"),
            customer_id: CustomerId::from_string("C-bench"),
            product_type_id: ProductTypeId::from_string("PT-bench"),
            title: "Benchmark order".to_string(),
            description: Some("for measuring the pure paths".to_string()),
            quantity: Some(100),
            received_date: NaiveDate::from_ymd_opt(2026, 2, 2).unwrap(),
            promised_date: NaiveDate::from_ymd_opt(2026, 2, 16).unwrap(),
            internal_due_date: None,
            notes: None,
            is_test: true,
        },
        at,
    )
}

fn actor() -> UserId {
    UserId::from_string("U-bench")
}

/// Builds a ledger of 1 creation + `updates` alternating mutations.
fn history(updates: usize) -> Vec<LedgerEntry> {
    let order = base_order();
    let mut entries = vec![LedgerEntry::created(&order, &actor(), order.created_at)];
    entries[0].seq = 1;

    let mut current = order;
    for i in 0..updates {
        let at = current.updated_at + Duration::minutes(10);
        let mutation = match i % 3 {
            0 => current
                .revise(
                    &OrderPatch {
                        quantity: Some(Some(100 + i as i32)),
                        notes: Some(Some(format!("pass {i}"))),
                        ..OrderPatch::default()
                    },
                    &actor(),
                    at,
                )
                .unwrap(),
            1 => current
                .assign_vendor(Some(VendorId::from_string(format!("V-{i}"))), &actor(), at)
                .unwrap(),
            _ => {
                let next = if current.status == OrderStatus::InProgress {
                    OrderStatus::Ready
                } else {
                    OrderStatus::InProgress
                };
                current.change_status(next, &actor(), at).unwrap().unwrap()
            }
        };
        let mut entry = mutation.entry;
        entry.seq = (i + 2) as i64;
        entries.push(entry);
        current = mutation.after;
    }
    entries
}

fn bench_diff(c: &mut Criterion) {
    let before = base_order();
    let mut after = before.clone();
    after.title = "Benchmark order, revised".to_string();
    after.quantity = Some(250);
    after.notes = Some("three fields changed".to_string());

    c.bench_function("domain/diff_three_changes", |b| {
        b.iter(|| diff(std::hint::black_box(&before), std::hint::black_box(&after)));
    });

    c.bench_function("domain/diff_no_changes", |b| {
        b.iter(|| diff(std::hint::black_box(&before), std::hint::black_box(&before)));
    });
}

fn bench_created_entry(c: &mut Criterion) {
    let order = base_order();
    let user = actor();

    c.bench_function("domain/created_entry_full_field_set", |b| {
        b.iter(|| LedgerEntry::created(std::hint::black_box(&order), &user, order.created_at));
    });
}

fn bench_replay(c: &mut Criterion) {
    let short = history(10);
    c.bench_function("domain/replay_10_entries", |b| {
        b.iter(|| replay(std::hint::black_box(&short)).unwrap());
    });

    let long = history(100);
    c.bench_function("domain/replay_100_entries", |b| {
        b.iter(|| replay(std::hint::black_box(&long)).unwrap());
    });
}

criterion_group!(benches, bench_diff, bench_created_entry, bench_replay);
criterion_main!(benches);
