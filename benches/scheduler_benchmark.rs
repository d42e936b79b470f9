use criterion::{black_box, criterion_group, criterion_main, Criterion};
use criterion_cycles_per_byte::CyclesPerByte;

use dmg_core::{Emulator, EmulatorOptionsBuilder};

/// A minimal, header-valid ROM: just enough for `Emulator::new` to accept it
/// without a real game loaded. Used so the benchmarks don't depend on test
/// ROMs being present on the benchmarking machine.
fn blank_rom() -> Vec<u8> {
    let mut rom = vec![0u8; 0x8000];
    // Nintendo logo check is skipped when no boot rom is supplied, so only
    // the cartridge type/ROM size/RAM size bytes need to be sane.
    rom[0x147] = 0x00; // ROM ONLY
    rom[0x148] = 0x00; // 32KB
    rom[0x149] = 0x00; // No RAM
    rom
}

fn single_step(c: &mut Criterion) {
    let rom = blank_rom();
    let mut emulator = Emulator::new(&rom, EmulatorOptionsBuilder::new().build()).unwrap();

    c.bench_function("emulate one instruction", |b| {
        b.iter(|| {
            emulator.step();
            black_box(emulator.frame_buffer());
        })
    });
}

fn emulate_frame(c: &mut Criterion) {
    let rom = blank_rom();
    let mut emulator = Emulator::new(&rom, EmulatorOptionsBuilder::new().build()).unwrap();

    c.bench_function("emulate one frame", |b| {
        b.iter(|| {
            emulator.emulate_frame();
            black_box(emulator.frame_buffer());
        })
    });
}

criterion_group!(
    name = benches;
    config = Criterion::default().with_measurement(CyclesPerByte);
    targets = single_step, emulate_frame
);
criterion_main!(benches);
