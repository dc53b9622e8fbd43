use criterion::criterion_main;

mod geofeed;

criterion_main!(geofeed::benches_geofeed);
