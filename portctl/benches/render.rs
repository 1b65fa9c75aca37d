use criterion::{black_box, criterion_group, criterion_main, Criterion};
use portctl::{render_status_page, BoardProfile, Level, PortController, PortServer, SimulatedHal};

fn initialized_controller() -> PortController<SimulatedHal> {
    let profile = BoardProfile::pico_w();
    let mut hal = SimulatedHal::new();
    hal.set_input_level(0, Level::High);
    hal.set_analog_raw(26, 32768);
    hal.set_analog_raw(29, 14000);
    let mut controller = PortController::new(profile.build_table().unwrap(), hal);
    controller.initialize().unwrap();
    controller
}

fn bench_render(c: &mut Criterion) {
    let controller = initialized_controller();
    let display = BoardProfile::pico_w().display_config();

    c.bench_function("render_status_page", |b| {
        b.iter(|| render_status_page(black_box(controller.table()), black_box(&display)))
    });
}

fn bench_request_cycle(c: &mut Criterion) {
    let mut server = PortServer::new(initialized_controller(), BoardProfile::pico_w().display_config());

    c.bench_function("process_pwm_request", |b| {
        b.iter(|| server.process(black_box("/P03-75pwm")))
    });
}

criterion_group!(benches, bench_render, bench_request_cycle);
criterion_main!(benches);
