use criterion::{black_box, criterion_group, criterion_main, Criterion};

fn sign_bench(c: &mut Criterion) {
    let kp = qnode_crypto::keypair_from_seed(&[42u8; 32]);
    let msg = "Qsender|Qrecipient|10.0|0.01|3|1700000000.0";

    c.bench_function("sha3_sign", |b| {
        b.iter(|| qnode_crypto::sign_message(black_box(msg), &kp.private_key))
    });
}

fn sha3_256_bench(c: &mut Criterion) {
    let data = vec![0xABu8; 1024];

    c.bench_function("sha3_256_1KB", |b| {
        b.iter(|| qnode_crypto::sha3_256_hex(black_box(&data)))
    });
}

fn keygen_bench(c: &mut Criterion) {
    c.bench_function("keypair_from_seed", |b| {
        b.iter(|| qnode_crypto::keypair_from_seed(black_box(&[7u8; 32])))
    });
}

fn address_bench(c: &mut Criterion) {
    let kp = qnode_crypto::keypair_from_seed(&[1u8; 32]);
    let addr = kp.address.as_str().to_string();

    c.bench_function("validate_address", |b| {
        b.iter(|| qnode_crypto::validate_address(black_box(&addr)))
    });
}

criterion_group!(benches, sign_bench, sha3_256_bench, keygen_bench, address_bench);
criterion_main!(benches);
