//! Benchmark for webhook signature verification.

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use webhook::{EventVerifier, format_signature_header};

const SECRET: &str = "whsec_bench_secret";

fn bench_verify(c: &mut Criterion) {
    let payload = serde_json::to_vec(&serde_json::json!({
        "id": "evt_bench",
        "type": "checkout.session.completed",
        "data": {
            "object": {
                "id": "sess_bench",
                "customer_email": "buyer@example.com",
                "amount_total": 1999,
                "metadata": { "product_name": "Copilot Pro Seat" }
            }
        }
    }))
    .unwrap();

    let verifier = EventVerifier::new(SECRET);
    let now = chrono::Utc::now();
    let header = format_signature_header(SECRET, now.timestamp(), &payload);

    c.bench_function("verify_signed_checkout_event", |b| {
        b.iter(|| {
            verifier
                .verify_at(black_box(&payload), Some(black_box(&header)), now)
                .unwrap()
        })
    });
}

criterion_group!(benches, bench_verify);
criterion_main!(benches);
