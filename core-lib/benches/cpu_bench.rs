use core_lib::GameBoy;
use criterion::{black_box, criterion_group, criterion_main, Criterion};

fn spin_rom(opcode: u8) -> Vec<u8> {
    let mut rom = vec![0u8; 0x8000];
    // The payload opcode followed by JR -3 keeps the CPU busy forever.
    rom[0x0100] = opcode;
    rom[0x0101] = 0x18;
    rom[0x0102] = 0xFD;
    rom
}

fn machine_with(opcode: u8) -> GameBoy {
    let mut gb = GameBoy::new();
    if gb.load_rom(&spin_rom(opcode)).is_err() {
        panic!("bench rom failed to load");
    }
    gb
}

fn cpu_step_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("cpu");
    group.sample_size(100);

    group.bench_function("nop loop", |b| {
        let mut gb = machine_with(0x00);
        b.iter(|| black_box(gb.step()));
    });

    group.bench_function("alu loop", |b| {
        let mut gb = machine_with(0x87); // ADD A,A
        b.iter(|| black_box(gb.step()));
    });

    group.finish();
}

fn frame_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("frame");
    group.sample_size(20);

    group.bench_function("step_frame", |b| {
        let mut gb = machine_with(0x00);
        b.iter(|| black_box(gb.step_frame()));
    });

    group.finish();
}

criterion_group!(benches, cpu_step_benchmark, frame_benchmark);
criterion_main!(benches);
