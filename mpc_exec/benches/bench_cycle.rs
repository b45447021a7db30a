//! # Cycle Benchmark

use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use mpc_lib::{
    ctrl::{Optimizer, ShootingOptimizer},
    cycle::{CycleDriver, NoDelay},
    latency::{CurrentActuation, LatencyModel},
    params::ExecParams,
    poly::Polynomial,
};
use nalgebra::Point2;
use util::module::State;

fn cycle_benchmark(c: &mut Criterion) {
    // ---- Build a telemetry frame on a gentle curve ----

    let ptsx: Vec<f64> = (0..6).map(|i| -20.0 + i as f64 * 15.0).collect();
    let ptsy: Vec<f64> = ptsx.iter().map(|x| 3.0 + 0.02 * x - 0.001 * x * x).collect();

    let frame = format!(
        "42[\"telemetry\",{{\"ptsx\":{:?},\"ptsy\":{:?},\"x\":-5.0,\"y\":2.5,\"psi\":0.1,\
         \"speed\":35.0,\"steering_angle\":-0.05,\"throttle\":0.3}}]",
        ptsx, ptsy
    );

    let points: Vec<Point2<f64>> = ptsx
        .iter()
        .zip(ptsy.iter())
        .map(|(x, y)| Point2::new(*x, *y))
        .collect();

    let params = Arc::new(ExecParams::default());

    // Bench the fit alone
    c.bench_function("Polynomial::fit", |b| {
        b.iter(|| Polynomial::fit(black_box(&points), 3).unwrap())
    });

    // Bench the optimizer alone
    let poly = Polynomial::fit(&points, 3).unwrap();
    let state = LatencyModel {
        latency_s: params.actuation_latency_s,
        lf_m: params.lf_m,
    }
    .compensate(
        &CurrentActuation {
            v_ms: 15.0,
            steer_rad: -0.05,
            throttle: 0.3,
        },
        &poly,
    );
    let mut optimizer = ShootingOptimizer::new(&params);

    c.bench_function("ShootingOptimizer::solve", |b| {
        b.iter(|| optimizer.solve(black_box(&state), &poly).unwrap())
    });

    // Bench a full cycle without the reply delay
    let mut driver = CycleDriver::new(ShootingOptimizer::new(&params), NoDelay);
    driver.init(params).unwrap();

    c.bench_function("CycleDriver::proc", |b| {
        b.iter(|| driver.proc(black_box(frame.as_str())).unwrap())
    });
}

criterion_group!(benches, cycle_benchmark);
criterion_main!(benches);
