use criterion::{black_box, criterion_group, Criterion};
use hopgeo::geofeed::GeoFeed;
use std::fmt::Write;
use std::net::IpAddr;

criterion_group!(benches_geofeed, bench_geofeed_lookup);

/// One /16 per first octet, a /24 inside each, and a handful of IPv6 /32s
fn synthetic_geofeed() -> GeoFeed {
    let mut csv = String::new();
    for a in 1u8..=223 {
        writeln!(csv, "{a}.0.0.0/16,US-CA,US,Mountain View").unwrap();
        writeln!(csv, "{a}.0.42.0/24,DE-HE,DE,Frankfurt,AS64500,Example").unwrap();
    }
    for n in 0u16..256 {
        writeln!(csv, "2001:{n:x}::/32,JP-13,JP,Tokyo").unwrap();
    }
    GeoFeed::from_reader(csv.as_bytes()).unwrap()
}

pub fn bench_geofeed_lookup(c: &mut Criterion) {
    let geofeed = synthetic_geofeed();
    let addresses: Vec<IpAddr> = [
        "1.0.42.1",
        "100.0.1.1",
        "223.0.42.200",
        "224.0.0.1",
        "2001:ff::1",
        "2620:fe::fe",
    ]
    .into_iter()
    .map(|s| s.parse().unwrap())
    .collect();

    c.bench_function("GeoFeed::lookup_addr", |b| {
        b.iter(|| {
            for address in addresses.iter() {
                black_box(geofeed.lookup_addr(black_box(*address)));
            }
        })
    });

    c.bench_function("GeoFeed::lookup", |b| {
        b.iter(|| black_box(geofeed.lookup(black_box("::ffff:100.0.42.7"))))
    });
}
