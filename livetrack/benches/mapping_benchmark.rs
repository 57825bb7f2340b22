use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use livetrack::packet::{format_for_receiver, format_live_packet};
use livetrack::{Detection, TrackObservation, WorldPositionMapper};
use rand::Rng;
use std::hint::black_box;
use worldtrack::{Bbox, EmaSmoother, Homography, KalmanSmoother, KalmanSmootherParams, Projector};

/// Generate person-sized detections scattered over the frame
fn generate_test_detections(count: usize, frame_width: f32, frame_height: f32) -> Vec<Detection> {
    let mut rng = rand::rng();

    (0..count)
        .map(|_| {
            let width = rng.random_range(30.0..90.0);
            let height = rng.random_range(120.0..300.0);
            let x = rng.random_range(0.0..(frame_width - width));
            let y = rng.random_range(0.0..(frame_height - height));
            Detection::new(
                Bbox::new(x, y, x + width, y + height),
                rng.random_range(0.3..0.95),
                0,
            )
        })
        .collect()
}

/// Frames of observations where every person drifts a few pixels per frame
fn generate_walk(count: usize, frames: usize) -> Vec<Vec<TrackObservation>> {
    let start = generate_test_detections(count, 1280.0, 720.0);
    (0..frames)
        .map(|frame| {
            let shift = frame as f32 * 3.0;
            start
                .iter()
                .enumerate()
                .map(|(i, det)| {
                    let b = det.bbox;
                    TrackObservation::new(
                        i as u32 + 1,
                        Bbox::new(b.xmin + shift, b.ymin, b.xmax + shift, b.ymax),
                        det.confidence,
                    )
                })
                .collect()
        })
        .collect()
}

fn calibrated_projector() -> Projector {
    let pixels = [(100.0, 700.0), (1180.0, 700.0), (900.0, 300.0), (380.0, 300.0)];
    let world = [(0.0, 0.0), (6.0, 0.0), (6.0, 10.0), (0.0, 10.0)];
    Projector::new(Some(
        Homography::from_correspondences(&pixels, &world).expect("valid calibration"),
    ))
}

/// Full per-cycle mapping: footprint, projection, smoothing, eviction
fn bench_map_tracks(c: &mut Criterion) {
    let mut group = c.benchmark_group("map_tracks");

    for &people in &[1, 10, 30] {
        let walk = generate_walk(people, 100);
        group.throughput(Throughput::Elements((people * walk.len()) as u64));

        group.bench_with_input(BenchmarkId::new("ema", people), &walk, |b, walk| {
            b.iter_batched(
                || {
                    WorldPositionMapper::new(
                        calibrated_projector(),
                        Box::new(EmaSmoother::new(0.6).expect("valid alpha")),
                        30,
                    )
                },
                |mut mapper| {
                    for (frame, tracks) in walk.iter().enumerate() {
                        black_box(mapper.map_tracks(tracks, frame as f64 / 15.0));
                    }
                },
                criterion::BatchSize::SmallInput,
            )
        });

        group.bench_with_input(BenchmarkId::new("kalman", people), &walk, |b, walk| {
            b.iter_batched(
                || {
                    WorldPositionMapper::new(
                        calibrated_projector(),
                        Box::new(KalmanSmoother::new(KalmanSmootherParams::default())),
                        30,
                    )
                },
                |mut mapper| {
                    for (frame, tracks) in walk.iter().enumerate() {
                        black_box(mapper.map_tracks(tracks, frame as f64 / 15.0));
                    }
                },
                criterion::BatchSize::SmallInput,
            )
        });
    }
    group.finish();
}

fn bench_packet_formatting(c: &mut Criterion) {
    let walk = generate_walk(30, 2);
    let mut mapper = WorldPositionMapper::new(
        calibrated_projector(),
        Box::new(EmaSmoother::new(0.6).expect("valid alpha")),
        30,
    );
    mapper.map_tracks(&walk[0], 0.0);
    let positions = mapper.map_tracks(&walk[1], 1.0 / 15.0);

    c.bench_function("packet_30_people", |b| {
        b.iter(|| {
            let packet = format_live_packet(black_box(&positions), "12:00:00");
            let entries = format_for_receiver(&packet);
            black_box(serde_json::to_vec(&entries).expect("serializable"))
        })
    });
}

criterion_group!(
    benches,
    bench_map_tracks,
    bench_packet_formatting
);
criterion_main!(benches);
