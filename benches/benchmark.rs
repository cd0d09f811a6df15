use criterion::{black_box, criterion_group, criterion_main, Criterion};
use stagecraft::{parse, tokenizer::tokenize, Value, Vm};

const STATION: &str = include_str!("../data/station.stage");

fn bench_frontend(c: &mut Criterion) {
    c.bench_function("tokenize station", |b| {
        b.iter(|| tokenize(black_box(STATION)))
    });
    c.bench_function("parse station", |b| b.iter(|| parse(black_box(STATION))));
}

fn bench_vm(c: &mut Criterion) {
    c.bench_function("tick station", |b| {
        let mut vm = Vm::default();
        vm.load_source(STATION).expect("station.stage loads");
        let _ = vm.start_game("station");
        b.iter(|| {
            // Keep the reactor below the breach threshold so every tick
            // does the same work.
            vm.set_state_value("reactor.temp", 90.0);
            vm.tick(black_box(16.0))
        })
    });

    c.bench_function("emit hit", |b| {
        let mut vm = Vm::default();
        vm.load_source(STATION).expect("station.stage loads");
        vm.set_state_value("guard.hp", 1_000_000.0);
        let data = Value::map([
            ("entity".to_string(), Value::from("guard")),
            ("amount".to_string(), Value::Number(1.0)),
        ]);
        b.iter(|| vm.emit("hit", black_box(data.clone())))
    });
}

criterion_group!(benches, bench_frontend, bench_vm);
criterion_main!(benches);
