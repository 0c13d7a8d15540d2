use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use swiftchannel::{Channel, ChannelConfig, ReadStatus, Receiver, Sender};

fn bench_config() -> ChannelConfig {
    ChannelConfig {
        ring_buffer_size: 4 * 1024 * 1024,
        max_message_size: 64 * 1024,
        ..Default::default()
    }
}

fn unique_name(tag: &str) -> String {
    format!("swift_bench_{}_{}", std::process::id(), tag)
}

struct ChannelFixture {
    name: String,
    sender: Sender,
    receiver: Receiver,
}

impl ChannelFixture {
    fn new(tag: &str) -> Self {
        let name = unique_name(tag);
        let _ = Channel::unlink(&name);
        let sender = Sender::connect(&name, bench_config()).unwrap();
        let receiver = Receiver::connect(&name, bench_config()).unwrap();
        Self {
            name,
            sender,
            receiver,
        }
    }
}

impl Drop for ChannelFixture {
    fn drop(&mut self) {
        let _ = Channel::unlink(&self.name);
    }
}

fn benchmark_send_recv_roundtrip(c: &mut Criterion) {
    let mut group = c.benchmark_group("roundtrip");

    let sizes = [
        (64, "64B"),           // sensor reading
        (1024, "1KB"),         // small record
        (16 * 1024, "16KB"),   // batched records
        (64 * 1024, "64KB"),   // max-size message
    ];

    for (size, label) in sizes.iter() {
        let mut fixture = ChannelFixture::new(&format!("rt_{label}"));
        let payload = vec![0x5Au8; *size];
        let mut dst = vec![0u8; *size];

        group.bench_with_input(BenchmarkId::new("send_recv", label), size, |b, _| {
            b.iter(|| {
                fixture.sender.send_bytes(black_box(&payload)).unwrap();
                match fixture.receiver.try_read(&mut dst).unwrap() {
                    ReadStatus::Received(n) => black_box(n),
                    other => panic!("unexpected status: {other:?}"),
                }
            });
        });
    }

    group.finish();
}

fn benchmark_send_until_full(c: &mut Criterion) {
    let mut group = c.benchmark_group("send");

    for (size, label) in [(64, "64B"), (1024, "1KB")] {
        let mut fixture = ChannelFixture::new(&format!("tx_{label}"));
        let payload = vec![0xA5u8; size];
        let mut sink = vec![0u8; size];

        group.bench_with_input(BenchmarkId::new("send", label), &size, |b, _| {
            b.iter(|| {
                // Drain-on-full keeps the producer path hot without letting
                // the ring saturate the measurement.
                if fixture.sender.send_bytes(black_box(&payload)).is_err() {
                    while let ReadStatus::Received(_) =
                        fixture.receiver.try_read(&mut sink).unwrap()
                    {}
                    fixture.sender.send_bytes(&payload).unwrap();
                }
            });
        });
    }

    group.finish();
}

fn benchmark_empty_poll(c: &mut Criterion) {
    let mut fixture = ChannelFixture::new("poll");
    let mut dst = [0u8; 64];

    c.bench_function("empty_poll", |b| {
        b.iter(|| {
            let status = fixture.receiver.try_read(&mut dst).unwrap();
            black_box(status)
        });
    });
}

fn benchmark_available_space(c: &mut Criterion) {
    let mut fixture = ChannelFixture::new("space");
    fixture.sender.send_bytes(&[0u8; 1024]).unwrap();

    c.bench_function("available_space", |b| {
        b.iter(|| black_box(fixture.sender.available_space()));
    });
}

criterion_group!(
    benches,
    benchmark_send_recv_roundtrip,
    benchmark_send_until_full,
    benchmark_empty_poll,
    benchmark_available_space
);
criterion_main!(benches);
