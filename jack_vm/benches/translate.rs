use criterion::{black_box, criterion_group, criterion_main, Criterion};
use jack_vm::{parse_program, Translator};

const CLASS: &str = "
class Main {
    function int main() {
        var Array a;
        var int i, sum;
        let a = Array.new(100);
        let i = 0;
        while (i < 100) {
            let a[i] = i * i;
            if ((i / 2) * 2 = i) { let sum = sum + a[i]; } else { let sum = sum - 1; }
            let i = i + 1;
        }
        do Output.printInt(sum);
        return sum;
    }
}
";

fn translate_benchmark(c: &mut Criterion) {
    let text = jack_compiler::compile_source("bench", CLASS)
        .map(|class| class.text)
        .unwrap_or_default();
    let commands = parse_program(&text).unwrap_or_default();

    c.bench_function("parse_vm_text", |b| {
        b.iter(|| parse_program(black_box(&text)))
    });

    c.bench_function("translate_to_asm", |b| {
        b.iter(|| Translator::new("Main").translate_program(black_box(&commands)))
    });
}

criterion_group!(benches, translate_benchmark);
criterion_main!(benches);
