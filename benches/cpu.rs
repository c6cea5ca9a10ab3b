#[macro_use]
extern crate criterion;

extern crate asm8086;

use criterion::Criterion;

use asm8086::machine::Machine;

fn exec_simple_loop(c: &mut Criterion) {
    let lines: Vec<String> = vec![
        "MOV CX, 0FFFFh".to_string(),
        "L:".to_string(),
        "DEC CX".to_string(),
        "JNZ L".to_string(),
        "HLT".to_string(),
    ];

    c.bench_function("run small dec/jnz loop", |b| {
        b.iter(|| {
            let mut m = Machine::with_default_memory();
            m.load_program(&lines).unwrap();
            loop {
                match m.step().unwrap() {
                    asm8086::machine::StepOutcome::Continue => continue,
                    asm8086::machine::StepOutcome::Finished => break,
                }
            }
        })
    });
}

fn compile_a_program(c: &mut Criterion) {
    let lines: Vec<String> = vec![
        "MOV AX, 1h".to_string(),
        "MOV BX, [BX+SI+2h]".to_string(),
        "ADD AX, BX".to_string(),
        "CMP AX, 10h".to_string(),
        "JL L".to_string(),
        "L:".to_string(),
        "HLT".to_string(),
    ];

    c.bench_function("load/compile a short program", |b| {
        b.iter(|| {
            let mut m = Machine::with_default_memory();
            m.load_program(&lines).unwrap();
        })
    });
}

criterion_group!(benches, exec_simple_loop, compile_a_program);
criterion_main!(benches);
